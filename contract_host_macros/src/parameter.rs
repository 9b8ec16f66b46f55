use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Fields, LitInt, LitStr};

enum Binding {
    Auto,
    Inline(Option<u32>),
    Named,
}

struct FieldParam {
    name: String,
    binding: Binding,
    skip: bool,
    /// Not on the wire at all.
    serde_skipped: bool,
}

pub fn derive_parameter(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            Fields::Unit => {
                return Ok(quote! {
                    impl #impl_generics ::contract_host::Parameter for #name #ty_generics #where_clause {
                        fn properties() -> ::std::vec::Vec<::contract_host::PropertyDecl> {
                            ::std::vec::Vec::new()
                        }
                    }
                });
            }
            Fields::Unnamed(_) => {
                return Err(syn::Error::new_spanned(
                    name,
                    "Parameter derive needs named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "Parameter derive only supports structs",
            ))
        }
    };

    let mut next_inline = 0u32;
    let mut decls = Vec::new();
    for field in fields {
        let Some(ident) = &field.ident else { continue };
        let param = parse_field(ident.to_string(), &field.attrs)?;
        if param.serde_skipped {
            continue;
        }

        let ty = &field.ty;
        let prop = LitStr::new(&param.name, ident.span());
        if param.skip {
            decls.push(quote! { ::contract_host::PropertyDecl::opaque(#prop) });
            continue;
        }
        let decl = quote! { ::contract_host::PropertyDecl::of::<#ty>(#prop) };
        decls.push(match param.binding {
            Binding::Auto => decl,
            Binding::Named => quote! { #decl.named() },
            Binding::Inline(sequence) => {
                let sequence = sequence.unwrap_or(next_inline);
                next_inline = sequence + 1;
                quote! { #decl.inline(#sequence) }
            }
        });
    }

    Ok(quote! {
        impl #impl_generics ::contract_host::Parameter for #name #ty_generics #where_clause {
            fn properties() -> ::std::vec::Vec<::contract_host::PropertyDecl> {
                ::std::vec![#(#decls),*]
            }
        }
    })
}

fn parse_field(default_name: String, attrs: &[Attribute]) -> syn::Result<FieldParam> {
    let mut param = FieldParam {
        name: default_name,
        binding: Binding::Auto,
        skip: false,
        serde_skipped: false,
    };

    for attr in attrs {
        // The wire name follows serde's field rename.
        if attr.path().is_ident("serde") {
            let _ = attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("rename") {
                    let value: LitStr = meta.value()?.parse()?;
                    param.name = value.value();
                } else if meta.path.is_ident("skip") || meta.path.is_ident("skip_deserializing") {
                    param.serde_skipped = true;
                } else if meta.input.peek(syn::Token![=]) {
                    let _: syn::Expr = meta.value()?.parse()?;
                }
                Ok(())
            });
            continue;
        }

        if !attr.path().is_ident("param") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("inline") {
                let sequence = if meta.input.peek(syn::Token![=]) {
                    let lit: LitInt = meta.value()?.parse()?;
                    Some(lit.base10_parse::<u32>()?)
                } else {
                    None
                };
                param.binding = Binding::Inline(sequence);
                Ok(())
            } else if meta.path.is_ident("named") {
                param.binding = Binding::Named;
                Ok(())
            } else if meta.path.is_ident("skip") {
                param.skip = true;
                Ok(())
            } else {
                Err(meta.error("expected `inline`, `inline = N`, `named` or `skip`"))
            }
        })?;
    }

    Ok(param)
}
