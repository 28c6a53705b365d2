//! Entry-point macros for the coldflow runtime.
//!
//! Both macros turn an `async fn` into a regular function that builds a
//! `coldflow::Runtime` and blocks on the body on its `main` context.

mod entry;

use entry::Entry;
use proc_macro::TokenStream;

/// Runs an `async fn main` on a freshly built runtime.
///
/// ```rust,ignore
/// #[coldflow::main(worker_threads = 4)]
/// async fn main() {
///     // runs on the `main` context
/// }
/// ```
#[proc_macro_attribute]
pub fn main(attr: TokenStream, item: TokenStream) -> TokenStream {
    entry::expand(Entry::Main, attr, item)
}

/// Like [`main`], for `#[test]` functions. Each test gets its own runtime.
#[proc_macro_attribute]
pub fn test(attr: TokenStream, item: TokenStream) -> TokenStream {
    entry::expand(Entry::Test, attr, item)
}
