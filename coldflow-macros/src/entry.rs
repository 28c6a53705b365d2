use proc_macro2::TokenStream;
use quote::quote;
use syn::parse::Parser;
use syn::{Block, ItemFn, LitInt};

pub(crate) enum Entry {
    Main,
    Test,
}

#[derive(Default)]
struct Config {
    worker_threads: Option<LitInt>,
}

fn parse_config(attr: proc_macro::TokenStream) -> syn::Result<Config> {
    let mut config = Config::default();

    let parser = syn::meta::parser(|meta| {
        if meta.path.is_ident("worker_threads") {
            let threads: LitInt = meta.value()?.parse()?;
            if threads.base10_parse::<usize>()? == 0 {
                return Err(syn::Error::new(threads.span(), "`worker_threads` must be > 0"));
            }
            config.worker_threads = Some(threads);
            Ok(())
        } else {
            Err(meta.error("unsupported argument, expected `worker_threads = N`"))
        }
    });

    parser.parse(attr)?;
    Ok(config)
}

pub(crate) fn expand(
    entry: Entry,
    attr: proc_macro::TokenStream,
    item: proc_macro::TokenStream,
) -> proc_macro::TokenStream {
    let expanded = parse_config(attr).and_then(|config| {
        let function = syn::parse::<ItemFn>(item)?;
        rewrite(entry, config, function)
    });

    match expanded {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn rewrite(entry: Entry, config: Config, mut function: ItemFn) -> syn::Result<TokenStream> {
    if function.sig.asyncness.take().is_none() {
        return Err(syn::Error::new_spanned(
            function.sig.fn_token,
            "the `async` keyword is missing from the function declaration",
        ));
    }

    let body = &function.block;
    let worker_threads = config
        .worker_threads
        .map(|threads| quote!(.worker_threads(#threads)));

    let block: Block = syn::parse2(quote! {
        {
            let runtime = ::coldflow::Runtime::builder()
                #worker_threads
                .build()
                .expect("failed to build the coldflow runtime");

            runtime.block_on(async move #body)
        }
    })?;
    function.block = Box::new(block);

    let test_attr = match entry {
        Entry::Test => Some(quote!(#[::core::prelude::v1::test])),
        Entry::Main => None,
    };

    Ok(quote! {
        #test_attr
        #function
    })
}
