use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::{Attribute, Data, DeriveInput, Fields, Ident, Index, Variant};

#[proc_macro_derive(ObjectTraversal, attributes(skip))]
pub fn derive_object_traversal(token_stream: TokenStream) -> TokenStream {
    let ast = syn::parse_macro_input!(token_stream as DeriveInput);

    match expand(&ast) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn is_skipped(attrs: &[Attribute]) -> bool {
    attrs.iter().any(|x| x.path.is_ident("skip"))
}

fn expand(ast: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &ast.ident;
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();

    let body = match &ast.data {
        Data::Struct(data) => traverse_struct_fields(&data.fields),
        Data::Enum(data) => {
            let arms: Vec<TokenStream2> = data.variants.iter().map(traverse_variant).collect();

            quote! {
                match self {
                    #(#arms)*
                }
            }
        }
        Data::Union(data) => {
            return Err(syn::Error::new(
                data.union_token.span,
                "ObjectTraversal can not be derived for unions",
            ))
        }
    };

    Ok(quote! {
        impl #impl_generics ::hearth_utils::ObjectTraversal for #name #ty_generics #where_clause {
            #[allow(unused_variables)]
            fn traverse<W: ::hearth_utils::ObjectWalker>(
                &mut self,
                walker: &mut W,
            ) -> ::core::result::Result<(), W::Error> {
                #body
                ::core::result::Result::Ok(())
            }
        }
    })
}

fn traverse_struct_fields(fields: &Fields) -> TokenStream2 {
    let mut traverse = vec![];

    for (idx, field) in fields.iter().enumerate() {
        if is_skipped(&field.attrs) {
            continue;
        }

        let access = match &field.ident {
            Some(ident) => quote!(#ident),
            None => {
                let index = Index::from(idx);
                quote!(#index)
            }
        };

        traverse.push(quote! {
            ::hearth_utils::ObjectTraversal::traverse(&mut self.#access, walker)?;
        });
    }

    quote!(#(#traverse)*)
}

fn traverse_variant(variant: &Variant) -> TokenStream2 {
    let name = &variant.ident;

    match &variant.fields {
        Fields::Named(named) => {
            let fields: Vec<&Ident> = named
                .named
                .iter()
                .filter(|x| !is_skipped(&x.attrs))
                .filter_map(|x| x.ident.as_ref())
                .collect();

            quote! {
                Self::#name { #(#fields,)* .. } => {
                    #(::hearth_utils::ObjectTraversal::traverse(#fields, walker)?;)*
                }
            }
        }

        Fields::Unnamed(unnamed) => {
            let mut bindings = vec![];
            let mut used = vec![];

            for (idx, field) in unnamed.unnamed.iter().enumerate() {
                if is_skipped(&field.attrs) {
                    bindings.push(quote!(_));
                } else {
                    let ident = Ident::new(&format!("f{}", idx), Span::call_site());
                    bindings.push(quote!(#ident));
                    used.push(ident);
                }
            }

            quote! {
                Self::#name(#(#bindings),*) => {
                    #(::hearth_utils::ObjectTraversal::traverse(#used, walker)?;)*
                }
            }
        }

        Fields::Unit => quote! {
            Self::#name => {}
        },
    }
}
