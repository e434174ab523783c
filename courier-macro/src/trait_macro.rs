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
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote, ToTokens};
use syn::{parse_macro_input, parse_quote, FnArg, ItemTrait, ReturnType, TraitItem, TraitItemFn, Type};

use crate::RpcAttr;

pub fn rpc_trait(attr: RpcAttr, item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as ItemTrait);
    match expand(attr, input) {
        Ok(expanded) => expanded.into(),
        Err(err) => err.into_compile_error().into(),
    }
}

struct RpcMethod {
    ident: syn::Ident,
    arg_types: Vec<Type>,
    output: TokenStream2,
}

/// Both stubs and services describe parameters with the same token text.
fn type_descriptor(ty: &Type) -> String {
    ty.to_token_stream().to_string()
}

fn parse_method(item_fn: &TraitItemFn) -> syn::Result<RpcMethod> {
    let sig = &item_fn.sig;
    if let Some(asyncness) = &sig.asyncness {
        return Err(syn::Error::new_spanned(
            asyncness,
            "rpc methods are synchronous; they run on the blocking worker pool",
        ));
    }
    if !sig.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &sig.generics,
            "rpc methods cannot be generic",
        ));
    }

    let mut inputs = sig.inputs.iter();
    match inputs.next() {
        Some(FnArg::Receiver(receiver))
            if receiver.reference.is_some() && receiver.mutability.is_none() => {}
        _ => return Err(syn::Error::new_spanned(sig, "rpc methods must take &self")),
    }
    let mut arg_types = vec![];
    for input in inputs {
        match input {
            FnArg::Typed(pat_type) => arg_types.push((*pat_type.ty).clone()),
            FnArg::Receiver(receiver) => {
                return Err(syn::Error::new_spanned(receiver, "unexpected receiver"))
            }
        }
    }

    let output = match &sig.output {
        ReturnType::Default => quote! {()},
        ReturnType::Type(_, res_type) => res_type.to_token_stream(),
    };
    Ok(RpcMethod {
        ident: sig.ident.clone(),
        arg_types,
        output,
    })
}

fn expand(attr: RpcAttr, input: ItemTrait) -> syn::Result<TokenStream2> {
    let trait_ident = input.ident.clone();
    let vis = input.vis.clone();
    let interface_name = match &attr.package {
        None => trait_ident.to_string(),
        Some(package) => format!("{}.{}", package, trait_ident),
    };

    let mut item_trait = input;
    let mut methods = vec![];
    for item in item_trait.items.iter_mut() {
        if let TraitItem::Fn(item_fn) = item {
            let method = parse_method(item_fn)?;
            let output = &method.output;
            item_fn.sig.output =
                parse_quote!(-> ::std::result::Result<#output, ::courier::ServiceError>);
            methods.push(method);
        }
    }

    let descriptors = methods.iter().map(|method| {
        let name = method.ident.to_string();
        let types = method.arg_types.iter().map(type_descriptor);
        quote!(::courier::MethodDescriptor::new(#name, &[#(#types),*]))
    });
    item_trait.items.push(parse_quote! {
        #[doc(hidden)]
        fn __courier_interface_name() -> &'static str
        where
            Self: Sized,
        {
            #interface_name
        }
    });
    item_trait.items.push(parse_quote! {
        #[doc(hidden)]
        fn __courier_methods() -> ::std::vec::Vec<::courier::MethodDescriptor>
        where
            Self: Sized,
        {
            vec![#(#descriptors),*]
        }
    });

    let client_fns = methods.iter().map(|method| {
        let ident = &method.ident;
        let name = ident.to_string();
        let output = &method.output;
        let types = &method.arg_types;
        let args: Vec<_> = (0..types.len()).map(|i| format_ident!("arg{}", i)).collect();
        let descriptors = types.iter().map(type_descriptor);
        quote! {
            #[allow(non_snake_case)]
            pub async fn #ident(&self, #(#args: #types),*) -> ::std::result::Result<#output, ::courier::RpcError> {
                let parameter_types = vec![#(#descriptors.to_string()),*];
                let parameters = vec![#(::courier::codegen::to_parameter(&#args)?),*];
                let value = self
                    .inner
                    .invoke(#interface_name, #name, parameter_types, parameters)
                    .await?;
                ::courier::codegen::from_result(value)
            }
        }
    });

    let rpc_client = format_ident!("{}Client", trait_ident);
    Ok(quote! {
        #item_trait

        #[derive(Clone)]
        #vis struct #rpc_client {
            inner: ::courier::RpcClient,
        }

        impl #rpc_client {
            pub const INTERFACE_NAME: &'static str = #interface_name;

            pub fn new(client: ::courier::RpcClient) -> #rpc_client {
                #rpc_client { inner: client }
            }

            #(
                #client_fns
            )*
        }
    })
}
