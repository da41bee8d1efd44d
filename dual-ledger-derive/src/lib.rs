use proc_macro::TokenStream;
use syn::{DeriveInput, Ident};

// MissingData -> missing_data
fn snake_case(ident: &Ident) -> String {
    let mut out = String::new();
    for (i, c) in ident.to_string().chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

fn impl_kind(ast: DeriveInput) -> TokenStream {
    let ident = ast.ident;

    let variants: Vec<Ident> = match ast.data {
        syn::Data::Struct(_) => panic!("Structs are not supported by Kind"),
        syn::Data::Enum(ref data) => data.variants.iter().map(|f| f.ident.clone()).collect(),
        syn::Data::Union(_) => panic!("Unions are not supported by Kind"),
    };

    let mut arms = quote::quote!();
    for variant in variants {
        let tag = snake_case(&variant);
        // brace patterns match unit, tuple and struct variants alike
        arms.extend(quote::quote! {
            #ident::#variant { .. } => #tag,
        });
    }
    quote::quote! {
        impl #ident {
            /// Stable tag naming the failure, e.g. `missing_data`
            pub fn kind(&self) -> &'static str {
                match self {
                    #arms
                }
            }
        }
    }
    .into()
}

/// Derives `fn kind(&self) -> &'static str` returning the variant name in snake case
#[proc_macro_derive(Kind)]
pub fn kind_derive_macro(item: TokenStream) -> TokenStream {
    let ast: DeriveInput = syn::parse(item).unwrap();
    impl_kind(ast)
}
