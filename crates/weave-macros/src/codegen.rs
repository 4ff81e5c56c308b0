//! Code generation for `#[contract]`
//!
//! Emits, next to the cleaned trait:
//! - a hidden provided method reporting the concrete receiver type
//! - the `<Trait>Proxy` struct forwarding every method through its chain
//! - `impl weave_core::Contract for dyn Trait`

use crate::parsing::{type_label, ContractDef, MethodDef, ParamMode};
use proc_macro2::TokenStream;
use quote::{format_ident, quote, ToTokens};
use syn::{FnArg, Ident, Pat, PatIdent, Signature, TraitItem};

/// Hidden provided method naming the implementing type
pub const RECEIVER_TYPE_FN: &str = "__weave_receiver_type";

pub fn expand(def: ContractDef) -> TokenStream {
    let receiver_fn = format_ident!("{}", RECEIVER_TYPE_FN);
    let trait_def = emit_trait(&def, &receiver_fn);
    let proxy = emit_proxy(&def, &receiver_fn);
    let contract_impl = emit_contract_impl(&def);

    quote! {
        #trait_def
        #proxy
        #contract_impl
    }
}

fn emit_trait(def: &ContractDef, receiver_fn: &Ident) -> TokenStream {
    let mut item = def.item.clone();
    item.items.push(TraitItem::Verbatim(quote! {
        #[doc(hidden)]
        fn #receiver_fn(&self) -> &'static str {
            ::std::any::type_name::<Self>()
        }
    }));
    item.into_token_stream()
}

fn emit_proxy(def: &ContractDef, receiver_fn: &Ident) -> TokenStream {
    let trait_name = def.name();
    let proxy = &def.proxy;
    let vis = &def.item.vis;
    let doc = format!("Woven proxy for [`{trait_name}`], generated by `#[contract]`.");

    let methods = def
        .methods
        .iter()
        .enumerate()
        .map(|(index, method)| emit_proxy_method(index, method, receiver_fn));

    quote! {
        #[doc = #doc]
        #vis struct #proxy {
            real: ::std::sync::Arc<dyn #trait_name>,
            weaving: ::std::sync::Arc<::weave_core::Weaving>,
        }

        #[allow(dead_code)]
        impl #proxy {
            /// Wrap `real` so every call runs through `weaving`
            pub fn new(
                real: ::std::sync::Arc<dyn #trait_name>,
                weaving: ::std::sync::Arc<::weave_core::Weaving>,
            ) -> Self {
                Self { real, weaving }
            }

            /// The wrapped real object
            pub fn real(&self) -> &::std::sync::Arc<dyn #trait_name> {
                &self.real
            }

            /// Weaving driving this proxy
            pub fn weaving(&self) -> &::std::sync::Arc<::weave_core::Weaving> {
                &self.weaving
            }
        }

        impl ::std::fmt::Debug for #proxy {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.debug_struct(::std::stringify!(#proxy))
                    .field("real", &self.real.#receiver_fn())
                    .field("weaving", &self.weaving.id())
                    .finish()
            }
        }

        impl #trait_name for #proxy {
            #(#methods)*

            fn #receiver_fn(&self) -> &'static str {
                self.real.#receiver_fn()
            }
        }
    }
}

fn emit_proxy_method(index: usize, method: &MethodDef, receiver_fn: &Ident) -> TokenStream {
    let name = method.name();
    let args: Vec<Ident> = (0..method.params.len())
        .map(|i| format_ident!("__weave_arg{}", i))
        .collect();
    let sig = rename_args(&method.sig, &args);

    let captures = method.params.iter().zip(&args).map(|(param, arg)| {
        let owned = match param.mode {
            ParamMode::Value => quote!(::std::clone::Clone::clone(&#arg)),
            ParamMode::Borrowed => quote!(::std::borrow::ToOwned::to_owned(#arg)),
            ParamMode::Mutable => quote!(::std::clone::Clone::clone(&*#arg)),
        };
        quote!(::weave_core::capture(#owned))
    });

    quote! {
        #sig {
            let __weave_chain = self.weaving.chain(#index);
            let mut __weave_ctx = ::weave_core::MethodContext::new(
                __weave_chain.contract(),
                __weave_chain.method(),
                &self.real,
                self.real.#receiver_fn(),
                ::std::vec![#(#captures),*],
            );
            match __weave_chain.invoke(&mut __weave_ctx, || self.real.#name(#(#args),*)) {
                ::std::result::Result::Ok(value) => value,
                ::std::result::Result::Err(err) => ::weave_core::raise(err),
            }
        }
    }
}

/// Give every typed argument a fixed name so the body can refer to it
fn rename_args(sig: &Signature, names: &[Ident]) -> Signature {
    let mut sig = sig.clone();
    let typed = sig.inputs.iter_mut().filter_map(|input| match input {
        FnArg::Typed(typed) => Some(typed),
        FnArg::Receiver(_) => None,
    });
    for (typed, name) in typed.zip(names) {
        *typed.pat = Pat::Ident(PatIdent {
            attrs: Vec::new(),
            by_ref: None,
            mutability: None,
            ident: name.clone(),
            subpat: None,
        });
    }
    sig
}

fn emit_contract_impl(def: &ContractDef) -> TokenStream {
    let trait_name = def.name();
    let proxy = &def.proxy;
    let name = trait_name.to_string();
    let visibility = if def.public {
        quote!(::weave_core::Visibility::Public)
    } else {
        quote!(::weave_core::Visibility::Restricted)
    };

    let methods = def.methods.iter().map(|method| {
        let method_name = method.name().to_string();
        let return_label = method.return_label();
        let params = method.params.iter().map(|param| {
            let param_name = &param.name;
            let label = type_label(param.ty.to_token_stream());
            let mode = match param.mode {
                ParamMode::Value => quote!(::weave_core::ParamMode::Value),
                ParamMode::Borrowed => quote!(::weave_core::ParamMode::Borrowed),
                ParamMode::Mutable => quote!(::weave_core::ParamMode::Mutable),
            };
            quote! {
                .with_param(::weave_core::ParamDescriptor::new(#param_name, #label, #mode))
            }
        });
        let aspects = method.aspects.iter().map(|aspect| {
            quote! {
                .with_aspect(::std::sync::Arc::new(#aspect) as ::weave_core::SharedAspect)
            }
        });
        quote! {
            .with_method(
                ::weave_core::MethodDescriptor::new(#method_name, #return_label)
                    #(#params)*
                    #(#aspects)*
            )
        }
    });

    quote! {
        impl ::weave_core::Contract for dyn #trait_name {
            fn descriptor() -> ::weave_core::ContractDescriptor {
                ::weave_core::ContractDescriptor::interface(
                    #name,
                    ::std::module_path!(),
                    #visibility,
                )
                #(#methods)*
            }

            fn weave(
                real: ::std::sync::Arc<Self>,
                weaving: ::std::sync::Arc<::weave_core::Weaving>,
            ) -> ::std::sync::Arc<Self> {
                ::std::sync::Arc::new(#proxy::new(real, weaving))
            }
        }
    }
}
