//! Contract trait parsing and shape validation
//!
//! Reads an annotated trait into a [`ContractDef`] and rejects every shape a
//! forwarding proxy cannot implement. Errors are spanned at the offending
//! item so they read like ordinary compiler diagnostics.

use proc_macro2::{Delimiter, Ident, TokenStream, TokenTree};
use quote::ToTokens;
use syn::{
    Attribute, Expr, FnArg, GenericParam, ItemTrait, Pat, ReturnType, Signature, TraitItem,
    TraitItemFn, Type, TypeParamBound, Visibility,
};

/// Attribute declaring a method-level aspect
pub const ASPECT_ATTR: &str = "aspect";

/// Options given to `#[contract(...)]`
#[derive(Debug, Default)]
pub struct ContractArgs {
    /// Name of the generated proxy struct
    pub proxy: Option<Ident>,
}

impl ContractArgs {
    pub fn parse(attr: TokenStream) -> syn::Result<Self> {
        let mut args = ContractArgs::default();
        if attr.is_empty() {
            return Ok(args);
        }

        let parser = syn::meta::parser(|meta| {
            if meta.path.is_ident("proxy") {
                args.proxy = Some(meta.value()?.parse()?);
                Ok(())
            } else {
                Err(meta.error("unsupported contract option, expected `proxy = Name`"))
            }
        });
        syn::parse::Parser::parse2(parser, attr)?;
        Ok(args)
    }
}

/// How an argument reaches the method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamMode {
    Value,
    Borrowed,
    Mutable,
}

/// One typed method argument
#[derive(Debug)]
pub struct ParamDef {
    pub name: String,
    pub ty: Type,
    pub mode: ParamMode,
}

/// One contract method
#[derive(Debug)]
pub struct MethodDef {
    pub sig: Signature,
    pub params: Vec<ParamDef>,
    pub aspects: Vec<Expr>,
}

impl MethodDef {
    pub fn name(&self) -> &Ident {
        &self.sig.ident
    }

    pub fn return_label(&self) -> String {
        match &self.sig.output {
            ReturnType::Default => "()".to_string(),
            ReturnType::Type(_, ty) => type_label(ty.to_token_stream()),
        }
    }
}

/// Parsed contract trait
#[derive(Debug)]
pub struct ContractDef {
    /// Trait with `#[aspect]` attributes stripped
    pub item: ItemTrait,
    pub methods: Vec<MethodDef>,
    pub public: bool,
    pub proxy: Ident,
}

impl ContractDef {
    pub fn parse(args: ContractArgs, mut item: ItemTrait) -> syn::Result<Self> {
        validate_trait(&item)?;

        let mut methods = Vec::new();
        for trait_item in &mut item.items {
            match trait_item {
                TraitItem::Fn(method) => methods.push(parse_method(method)?),
                other => {
                    return Err(syn::Error::new_spanned(
                        other,
                        "contracts may only contain methods",
                    ))
                }
            }
        }

        let public = matches!(item.vis, Visibility::Public(_));
        let proxy = args
            .proxy
            .unwrap_or_else(|| quote::format_ident!("{}Proxy", item.ident));

        Ok(ContractDef {
            item,
            methods,
            public,
            proxy,
        })
    }

    pub fn name(&self) -> &Ident {
        &self.item.ident
    }
}

fn validate_trait(item: &ItemTrait) -> syn::Result<()> {
    if item.unsafety.is_some() {
        return Err(syn::Error::new_spanned(
            item.unsafety,
            "unsafe traits cannot be contracts",
        ));
    }
    if item.auto_token.is_some() {
        return Err(syn::Error::new_spanned(
            item.auto_token,
            "auto traits cannot be contracts",
        ));
    }
    if !item.generics.params.is_empty() || item.generics.where_clause.is_some() {
        return Err(syn::Error::new_spanned(
            &item.generics,
            "generic contracts are not supported",
        ));
    }

    for bound in &item.supertraits {
        let allowed = match bound {
            TypeParamBound::Lifetime(lifetime) => lifetime.ident == "static",
            TypeParamBound::Trait(bound) => bound
                .path
                .segments
                .last()
                .map(|segment| segment.ident == "Send" || segment.ident == "Sync")
                .unwrap_or(false),
            _ => false,
        };
        if !allowed {
            return Err(syn::Error::new_spanned(
                bound,
                "contracts may only require `Send`, `Sync` or `'static`",
            ));
        }
    }

    Ok(())
}

fn parse_method(method: &mut TraitItemFn) -> syn::Result<MethodDef> {
    let aspects = take_aspects(&mut method.attrs)?;
    let sig = &method.sig;

    if sig.asyncness.is_some() {
        return Err(syn::Error::new_spanned(
            sig.asyncness,
            "async methods cannot be woven",
        ));
    }
    if sig.unsafety.is_some() || sig.abi.is_some() || sig.constness.is_some() {
        return Err(syn::Error::new_spanned(
            &sig.ident,
            "contract methods must be plain safe functions",
        ));
    }
    if sig.variadic.is_some() {
        return Err(syn::Error::new_spanned(
            &sig.variadic,
            "variadic methods cannot be woven",
        ));
    }
    if let Some(param) = sig
        .generics
        .params
        .iter()
        .find(|param| !matches!(param, GenericParam::Lifetime(_)))
    {
        return Err(syn::Error::new_spanned(
            param,
            "generic methods are not supported",
        ));
    }
    if let Some(where_clause) = &sig.generics.where_clause {
        return Err(syn::Error::new_spanned(
            where_clause,
            "where clauses are not supported on contract methods",
        ));
    }

    let mut inputs = sig.inputs.iter();
    match inputs.next() {
        Some(FnArg::Receiver(receiver))
            if receiver.reference.is_some() && receiver.mutability.is_none() => {}
        Some(FnArg::Receiver(receiver)) => {
            return Err(syn::Error::new_spanned(
                receiver,
                "contract methods must take `&self`",
            ))
        }
        _ => {
            return Err(syn::Error::new_spanned(
                &sig.ident,
                "contract methods need a `&self` receiver",
            ))
        }
    }

    let mut params = Vec::new();
    for (index, input) in inputs.enumerate() {
        let FnArg::Typed(typed) = input else {
            return Err(syn::Error::new_spanned(input, "unexpected receiver"));
        };
        let ty = (*typed.ty).clone();
        let mode = match &ty {
            Type::ImplTrait(_) => {
                return Err(syn::Error::new_spanned(
                    &ty,
                    "`impl Trait` arguments are not supported",
                ))
            }
            Type::Reference(reference) if matches!(*reference.elem, Type::ImplTrait(_)) => {
                return Err(syn::Error::new_spanned(
                    &ty,
                    "`impl Trait` arguments are not supported",
                ))
            }
            Type::Reference(reference) if reference.mutability.is_some() => ParamMode::Mutable,
            Type::Reference(_) => ParamMode::Borrowed,
            _ => ParamMode::Value,
        };
        let name = match &*typed.pat {
            Pat::Ident(pat) => pat.ident.to_string(),
            _ => format!("arg{index}"),
        };
        params.push(ParamDef { name, ty, mode });
    }

    if let ReturnType::Type(_, ty) = &sig.output {
        if matches!(**ty, Type::Reference(_) | Type::ImplTrait(_)) {
            return Err(syn::Error::new_spanned(
                ty,
                "contract methods must return owned values",
            ));
        }
    }

    Ok(MethodDef {
        sig: sig.clone(),
        params,
        aspects,
    })
}

/// Remove `#[aspect(expr)]` attributes, returning their expressions in order
fn take_aspects(attrs: &mut Vec<Attribute>) -> syn::Result<Vec<Expr>> {
    let mut aspects = Vec::new();
    let mut kept = Vec::with_capacity(attrs.len());
    for attr in attrs.drain(..) {
        if attr.path().is_ident(ASPECT_ATTR) {
            aspects.push(attr.parse_args::<Expr>()?);
        } else {
            kept.push(attr);
        }
    }
    *attrs = kept;
    Ok(aspects)
}

/// Render a type the way it is written, without token spacing artifacts
pub fn type_label(tokens: TokenStream) -> String {
    let mut out = String::new();
    write_label(&mut out, tokens);
    out
}

fn write_label(out: &mut String, tokens: TokenStream) {
    let mut previous_word = false;
    for token in tokens {
        match token {
            TokenTree::Ident(ident) => {
                if previous_word {
                    out.push(' ');
                }
                out.push_str(&ident.to_string());
                previous_word = true;
            }
            TokenTree::Literal(literal) => {
                if previous_word {
                    out.push(' ');
                }
                out.push_str(&literal.to_string());
                previous_word = true;
            }
            TokenTree::Punct(punct) => {
                out.push(punct.as_char());
                if punct.as_char() == ',' {
                    out.push(' ');
                }
                previous_word = false;
            }
            TokenTree::Group(group) => {
                let (open, close) = match group.delimiter() {
                    Delimiter::Parenthesis => ("(", ")"),
                    Delimiter::Bracket => ("[", "]"),
                    Delimiter::Brace => ("{", "}"),
                    Delimiter::None => ("", ""),
                };
                out.push_str(open);
                write_label(out, group.stream());
                out.push_str(close);
                previous_word = false;
            }
        }
    }
}
