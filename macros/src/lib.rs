//! Test attribute shared by the `rxflow` test suites.
//!
//! `#[rxflow_macro::test]` expands to `#[test]` (or `#[tokio::test]` for
//! `async fn`) on native targets and to `wasm_bindgen_test` on wasm32.
use proc_macro::TokenStream;
use quote::quote;
use syn::{Ident, ItemFn, LitStr, parse_macro_input, spanned::Spanned};

const USAGE: &str = "rxflow_macro::test only accepts: #[rxflow_macro::test], \
                     #[rxflow_macro::test(current)] or #[rxflow_macro::test(multi)]";

fn runtime_flavor(name: &str, span: proc_macro2::Span) -> syn::Result<proc_macro2::TokenStream> {
  match name {
    "current" => Ok(quote!(flavor = "current_thread")),
    "multi" => Ok(quote!(flavor = "multi_thread", worker_threads = 2)),
    _ => Err(syn::Error::new(span, USAGE)),
  }
}

#[proc_macro_attribute]
pub fn test(attr: TokenStream, item: TokenStream) -> TokenStream {
  let input = parse_macro_input!(item as ItemFn);
  let is_async = input.sig.asyncness.is_some();
  let raw_args = proc_macro2::TokenStream::from(attr);

  let tokio_args = if raw_args.is_empty() {
    Ok(proc_macro2::TokenStream::new())
  } else if !is_async {
    Err(syn::Error::new(
      raw_args.span(),
      "runtime flavors are only meaningful for async tests; drop the argument or make the \
       function async",
    ))
  } else if let Ok(ident) = syn::parse2::<Ident>(raw_args.clone()) {
    runtime_flavor(&ident.to_string(), ident.span())
  } else if let Ok(lit) = syn::parse2::<LitStr>(raw_args.clone()) {
    runtime_flavor(&lit.value(), lit.span())
  } else {
    Err(syn::Error::new(raw_args.span(), USAGE))
  };

  let tokio_args = match tokio_args {
    Ok(args) => args,
    Err(err) => return TokenStream::from(err.to_compile_error()),
  };

  let wasm_attr = quote!(wasm_bindgen_test::wasm_bindgen_test);
  let native_attr = if is_async { quote!(tokio::test(#tokio_args)) } else { quote!(test) };

  let expanded = quote! {
      #[cfg_attr(target_arch = "wasm32", #wasm_attr)]
      #[cfg_attr(not(target_arch = "wasm32"), #native_attr)]
      #input
  };

  TokenStream::from(expanded)
}
