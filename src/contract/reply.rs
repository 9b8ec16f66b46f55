//! Response capabilities: failure population and file-like results.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Mutable view of a response's success flag and failure message.
pub struct FailureFields<'a> {
    pub success: &'a mut bool,
    pub failure_information: &'a mut String,
}

/// Borrowed view of a file-like result.
pub struct FileContent<'a> {
    pub content_type: &'a str,
    pub file_name: &'a str,
    pub bytes: &'a [u8],
}

/// Result type of an operation.
///
/// Both capabilities are opt-in. A reply without failure fields is returned
/// as an unpopulated default instance when a fault is translated.
pub trait Reply: Serialize + Default + Send + 'static {
    fn failure_fields(&mut self) -> Option<FailureFields<'_>> {
        None
    }

    fn file_content(&self) -> Option<FileContent<'_>> {
        None
    }
}

impl Reply for () {}
impl Reply for String {}
impl Reply for Value {}

/// Common base shape for replies carrying a success flag and failure message.
///
/// Embed it with `#[serde(flatten)]` and declare the capability with
/// `reply_shape!(MyResponse, base = status)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceResponse {
    pub success: bool,
    #[serde(default)]
    pub failure_information: String,
}

impl Default for ServiceResponse {
    fn default() -> Self {
        Self {
            success: true,
            failure_information: String::new(),
        }
    }
}

impl Reply for ServiceResponse {
    fn failure_fields(&mut self) -> Option<FailureFields<'_>> {
        Some(FailureFields {
            success: &mut self.success,
            failure_information: &mut self.failure_information,
        })
    }
}

/// File-like result streamed as raw bytes with a content-disposition header.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileResponse {
    pub content_type: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl FileResponse {
    pub fn new(
        content_type: impl Into<String>,
        file_name: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            content_type: content_type.into(),
            file_name: file_name.into(),
            bytes: bytes.into(),
        }
    }
}

impl Reply for FileResponse {
    fn file_content(&self) -> Option<FileContent<'_>> {
        Some(FileContent {
            content_type: &self.content_type,
            file_name: &self.file_name,
            bytes: &self.bytes,
        })
    }
}

/// Implement [`Reply`] for a response type.
///
/// - `reply_shape!(T)`: `T` has `success: bool` and `failure_information: String` fields.
/// - `reply_shape!(T, base = field)`: `T` embeds a [`ServiceResponse`] in `field`.
/// - `reply_shape!(T, plain)`: `T` carries no failure fields.
///
/// # Example
/// ```ignore
/// #[derive(Default, Serialize, Deserialize)]
/// pub struct GetCustomerResponse {
///     pub customer: Customer,
///     pub success: bool,
///     pub failure_information: String,
/// }
///
/// contract_host::reply_shape!(GetCustomerResponse);
/// ```
#[macro_export]
macro_rules! reply_shape {
    ($ty:ty) => {
        impl $crate::Reply for $ty {
            fn failure_fields(&mut self) -> ::std::option::Option<$crate::FailureFields<'_>> {
                ::std::option::Option::Some($crate::FailureFields {
                    success: &mut self.success,
                    failure_information: &mut self.failure_information,
                })
            }
        }
    };
    ($ty:ty, base = $field:ident) => {
        impl $crate::Reply for $ty {
            fn failure_fields(&mut self) -> ::std::option::Option<$crate::FailureFields<'_>> {
                ::std::option::Option::Some($crate::FailureFields {
                    success: &mut self.$field.success,
                    failure_information: &mut self.$field.failure_information,
                })
            }
        }
    };
    ($ty:ty, plain) => {
        impl $crate::Reply for $ty {}
    };
}
