/*
 * Licensed to the Apache Software Foundation (ASF) under one or more
 * contributor license agreements.  See the NOTICE file distributed with
 * this work for additional information regarding copyright ownership.
 * The ASF licenses this file to You under the Apache License, Version 2.0
 * (the "License"); you may not use this file except in compliance with
 * the License.  You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

use proc_macro::TokenStream;
use quote::ToTokens;
use syn::parse::Parser;

mod server_macro;
mod trait_macro;

/// Declares an RPC interface. The trait methods become fallible with
/// `courier::ServiceError`, and a `{Trait}Client` stub with one async method
/// per interface method is generated next to it.
///
/// The interface name is `package.Trait`, or just `Trait` without a package.
#[proc_macro_attribute]
pub fn rpc_trait(attr: TokenStream, item: TokenStream) -> TokenStream {
    let attr = RpcAttr::from_attr(attr);
    match attr {
        Ok(attr) => trait_macro::rpc_trait(attr, item),
        Err(err) => err.into_compile_error().into(),
    }
}

/// Implements `courier::RpcService` for the type of an `impl Trait for Type`
/// block, where `Trait` carries `#[rpc_trait]`.
#[proc_macro_attribute]
pub fn rpc_server(attr: TokenStream, item: TokenStream) -> TokenStream {
    if !attr.is_empty() {
        return syn::Error::new(
            proc_macro2::Span::call_site(),
            "#[rpc_server] takes no arguments; the interface name comes from #[rpc_trait]",
        )
        .into_compile_error()
        .into();
    }
    server_macro::rpc_server(item)
}

#[derive(Default)]
struct RpcAttr {
    package: Option<String>,
}

impl RpcAttr {
    fn from_attr(args: TokenStream) -> Result<RpcAttr, syn::Error> {
        syn::punctuated::Punctuated::<syn::Meta, syn::Token![,]>::parse_terminated
            .parse2(args.into())
            .and_then(Self::build_attr)
    }

    fn build_attr(
        args: syn::punctuated::Punctuated<syn::Meta, syn::Token![,]>,
    ) -> Result<RpcAttr, syn::Error> {
        let mut package = None;
        for arg in args {
            match arg {
                syn::Meta::NameValue(namevalue) => {
                    let ident = namevalue
                        .path
                        .get_ident()
                        .ok_or_else(|| {
                            syn::Error::new_spanned(&namevalue, "Must have specified ident")
                        })?
                        .to_string()
                        .to_lowercase();
                    let lit = match &namevalue.value {
                        syn::Expr::Lit(syn::ExprLit {
                            lit: syn::Lit::Str(lit),
                            ..
                        }) => lit.value(),
                        expr => expr.to_token_stream().to_string(),
                    };
                    match ident.as_str() {
                        "package" => {
                            let _ = package.insert(lit);
                        }
                        name => {
                            let msg = format!(
                                "Unknown attribute {} is specified; expected: 'package'",
                                name
                            );
                            return Err(syn::Error::new_spanned(namevalue, msg));
                        }
                    }
                }
                other => {
                    return Err(syn::Error::new_spanned(
                        other,
                        "Unknown attribute inside the courier-macro",
                    ));
                }
            }
        }
        Ok(RpcAttr { package })
    }
}
