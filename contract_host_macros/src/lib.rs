mod param_enum;
mod parameter;

use proc_macro::TokenStream;

/// Derive macro for the `Parameter` trait.
///
/// Lists the struct's fields as URL-bindable properties, in declaration
/// order, with the kind taken from each field's type.
///
/// # Field attributes
///
/// - `#[param(inline)]`: bind to the next inline path segment
/// - `#[param(inline = N)]`: bind to inline segment `N`
/// - `#[param(named)]`: bind to a query-string key only
/// - `#[param(skip)]`: body only, for any field type; still counted as a
///   property and still filled by query and route values
///
/// Fields marked `#[serde(skip)]` are left out entirely.
///
/// A field's property name is its serde name, so `#[serde(rename = "Id")]`
/// is honored.
///
/// # Example
///
/// ```ignore
/// #[derive(Default, Serialize, Deserialize, Parameter)]
/// pub struct GetCustomerRequest {
///     #[serde(rename = "Id")]
///     #[param(inline)]
///     pub id: String,
///     #[param(named)]
///     pub include_orders: bool,
/// }
/// ```
#[proc_macro_derive(Parameter, attributes(param))]
pub fn derive_parameter(input: TokenStream) -> TokenStream {
    parameter::derive_parameter(input)
}

/// Derive macro for `ParamType` on unit-only enums.
///
/// URL tokens must spell a member name exactly (case-sensitive).
///
/// ```ignore
/// #[derive(Serialize, Deserialize, ParamEnum)]
/// pub enum Region { North, South }
/// ```
#[proc_macro_derive(ParamEnum)]
pub fn derive_param_enum(input: TokenStream) -> TokenStream {
    param_enum::derive_param_enum(input)
}
