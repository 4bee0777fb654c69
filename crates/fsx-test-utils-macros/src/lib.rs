// Copyright 2025 Schelling Point Labs Inc
// SPDX-License-Identifier: AGPL-3.0-only

//! `#[logged_test]`: wraps a test in a `fsx_test_utils::TestLoggerGuard` so
//! that it gets its own log file and captured tracing output.

use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::{parse_macro_input, spanned::Spanned, ItemFn, ReturnType, Type};

/// Attribute macro for synchronous tests.
///
/// The body sees a `logger: &mut fsx_test_utils::TestLogger` binding:
///
/// ```rust,ignore
/// #[fsx_test_utils::logged_test]
/// fn opens_root() {
///     logger.log("running").unwrap();
/// }
/// ```
///
/// Tests returning `Result` have an `Err` recorded as a failure in the log
/// before it is propagated to the harness.
#[proc_macro_attribute]
pub fn logged_test(attr: TokenStream, item: TokenStream) -> TokenStream {
    if !attr.is_empty() {
        return syn::Error::new(Span::call_site(), "#[logged_test] does not accept arguments")
            .to_compile_error()
            .into();
    }

    let input = parse_macro_input!(item as ItemFn);

    if let Some(async_token) = &input.sig.asyncness {
        return syn::Error::new(
            async_token.span(),
            "#[logged_test] cannot be applied to async functions",
        )
        .to_compile_error()
        .into();
    }

    expand(input).into()
}

fn expand(mut input: ItemFn) -> TokenStream2 {
    input.attrs.retain(|attr| !is_logged_attr(attr));

    let fn_ident = &input.sig.ident;
    let fn_name = fn_ident.to_string();

    if !input.sig.inputs.is_empty() {
        return syn::Error::new(
            fn_ident.span(),
            "#[logged_test] can only be applied to functions without parameters",
        )
        .to_compile_error();
    }

    let visibility = &input.vis;
    let generics = &input.sig.generics;
    let (returns_result, return_tokens) = classify_return(&input.sig.output);
    let finish = if returns_result {
        finish_result()
    } else {
        finish_value()
    };
    let block = &input.block;
    let other_attrs = &input.attrs;

    quote! {
        #[::core::prelude::v1::test]
        #(#other_attrs)*
        #visibility fn #fn_ident #generics () #return_tokens {
            let mut __guard = ::fsx_test_utils::TestLoggerGuard::new(#fn_name)
                .expect("failed to create TestLogger");
            let mut logger = __guard.logger();
            let _ = &mut logger;

            let inner_result = { #block };
            drop(logger);
            #finish
        }
    }
}

fn classify_return(output: &ReturnType) -> (bool, TokenStream2) {
    match output {
        ReturnType::Default => (false, quote! {}),
        ReturnType::Type(arrow, ty) => (is_result_type(ty), quote! { #arrow #ty }),
    }
}

fn is_result_type(ty: &Type) -> bool {
    match ty {
        Type::Path(type_path) => type_path
            .path
            .segments
            .last()
            .is_some_and(|segment| segment.ident == "Result"),
        _ => false,
    }
}

fn finish_value() -> TokenStream2 {
    quote! {
        if let Err(e) = __guard.finish_success() {
            panic!("failed to finalize TestLogger: {}", e);
        }
        inner_result
    }
}

fn finish_result() -> TokenStream2 {
    quote! {
        match inner_result {
            ::std::result::Result::Ok(value) => {
                if let Err(e) = __guard.finish_success() {
                    panic!("failed to finalize TestLogger: {}", e);
                }
                ::std::result::Result::Ok(value)
            }
            ::std::result::Result::Err(err) => {
                let __err_msg = format!("{}", err);
                if let Err(e) = __guard.finish_failure(&__err_msg) {
                    eprintln!("failed to finalize TestLogger after error: {}", e);
                }
                ::std::result::Result::Err(err)
            }
        }
    }
}

fn is_logged_attr(attr: &syn::Attribute) -> bool {
    attr.path()
        .segments
        .last()
        .is_some_and(|segment| segment.ident == "logged_test")
}
