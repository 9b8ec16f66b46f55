use proc_macro::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, LitStr};

pub fn derive_param_enum(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as DeriveInput);
    let name = &input.ident;

    let Data::Enum(data) = &input.data else {
        return syn::Error::new_spanned(name, "ParamEnum derive only supports enums")
            .to_compile_error()
            .into();
    };

    let mut members = Vec::new();
    for variant in &data.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return syn::Error::new_spanned(variant, "ParamEnum variants must be unit variants")
                .to_compile_error()
                .into();
        }
        let mut member = variant.ident.to_string();
        for attr in &variant.attrs {
            if attr.path().is_ident("serde") {
                let _ = attr.parse_nested_meta(|meta| {
                    if meta.path.is_ident("rename") {
                        let value: LitStr = meta.value()?.parse()?;
                        member = value.value();
                    }
                    Ok(())
                });
            }
        }
        members.push(LitStr::new(&member, variant.ident.span()));
    }

    let expanded = quote! {
        impl ::contract_host::ParamType for #name {
            fn kind() -> ::contract_host::ParamKind {
                ::contract_host::ParamKind::Enum(&[#(#members),*])
            }
        }
    };

    TokenStream::from(expanded)
}
