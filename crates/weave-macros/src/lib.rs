//! Weave Proc Macros
//!
//! This crate provides the `#[contract]` attribute, which turns an ordinary
//! object-safe trait into a weavable contract: it generates the forwarding
//! proxy and the `weave_core::Contract` impl for `dyn Trait`.
//!
//! # Example
//!
//! ```ignore
//! use weave_core::CacheAspect;
//! use weave_macros::contract;
//!
//! #[contract]
//! pub trait UserRepository: Send + Sync {
//!     fn save(&self, user: User);
//!
//!     #[aspect(CacheAspect::in_memory())]
//!     fn get_by_id(&self, id: Uuid) -> Option<User>;
//! }
//!
//! let repo: Arc<dyn UserRepository> = factory.create(Arc::new(InMemoryUserRepository::new()))?;
//! ```
//!
//! # Contract shape
//!
//! Every method must take `&self`, use owned (`T`), shared (`&T`) or
//! exclusive (`&mut T`) arguments and return an owned value. Captured
//! arguments and results must be `Clone + Debug + Send + Sync + 'static`
//! (borrowed arguments through `ToOwned`). Associated items, async methods,
//! type or const generics, `impl Trait` arguments and borrowed returns are
//! rejected at compile time.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use syn::Result;

mod codegen;
mod parsing;

use parsing::{ContractArgs, ContractDef};

/// Declare a weavable contract.
///
/// # Options
///
/// - `#[contract(proxy = Name)]` - name of the generated proxy struct
///   (defaults to `<Trait>Proxy`)
///
/// # Method attributes
///
/// - `#[aspect(expr)]` - attach the aspect built by `expr` to this method;
///   repeat to attach several, in declaration order
///
/// # Generated Code
///
/// - The trait itself, with `#[aspect]` attributes removed and a hidden
///   provided method reporting the implementing type's name
/// - `<Trait>Proxy`, forwarding each method through its aspect chain
/// - `impl weave_core::Contract for dyn Trait`
#[proc_macro_attribute]
pub fn contract(attr: TokenStream, item: TokenStream) -> TokenStream {
    match contract_impl(attr.into(), item.into()) {
        Ok(output) => output.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn contract_impl(attr: TokenStream2, item: TokenStream2) -> Result<TokenStream2> {
    let args = ContractArgs::parse(attr)?;
    let item = syn::parse2::<syn::Item>(item)?;
    let syn::Item::Trait(item) = item else {
        return Err(syn::Error::new_spanned(
            item,
            "#[contract] can only be applied to traits",
        ));
    };
    let def = ContractDef::parse(args, item)?;
    Ok(codegen::expand(def))
}

#[cfg(test)]
mod tests {
    use super::*;
    use quote::quote;

    #[test]
    fn expands_a_plain_trait() {
        let out = contract_impl(
            TokenStream2::new(),
            quote! {
                pub trait Clock: Send + Sync {
                    fn now(&self) -> u64;
                }
            },
        )
        .unwrap();
        assert!(out.to_string().contains("ClockProxy"));
    }

    #[test]
    fn rejects_non_traits() {
        let err = contract_impl(TokenStream2::new(), quote!(struct Clock;)).unwrap_err();
        assert!(err.to_string().contains("only be applied to traits"));
    }

    #[test]
    fn rejects_unknown_options() {
        let err = contract_impl(quote!(cached = true), quote!(trait Clock {})).unwrap_err();
        assert!(err.to_string().contains("unsupported contract option"));
    }
}
