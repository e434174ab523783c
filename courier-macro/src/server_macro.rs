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
use quote::{format_ident, quote};
use syn::{parse_macro_input, FnArg, ImplItem, ItemImpl};

pub fn rpc_server(item: TokenStream) -> TokenStream {
    let item_impl = parse_macro_input!(item as ItemImpl);
    match expand(item_impl) {
        Ok(expanded) => expanded.into(),
        Err(err) => err.into_compile_error().into(),
    }
}

fn expand(item_impl: ItemImpl) -> syn::Result<TokenStream2> {
    let trait_path = match &item_impl.trait_ {
        Some((None, path, _)) => path.clone(),
        _ => {
            return Err(syn::Error::new_spanned(
                &item_impl.self_ty,
                "#[rpc_server] goes on an `impl Trait for Type` block",
            ))
        }
    };
    let self_ty = &item_impl.self_ty;
    let (impl_generics, _, where_clause) = item_impl.generics.split_for_impl();

    let arms = item_impl.items.iter().fold(vec![], |mut vec, e| {
        if let ImplItem::Fn(fn_item) = e {
            let ident = &fn_item.sig.ident;
            let name = ident.to_string();
            let types: Vec<_> = fn_item
                .sig
                .inputs
                .iter()
                .filter_map(|input| match input {
                    FnArg::Typed(pat_type) => Some(&pat_type.ty),
                    FnArg::Receiver(_) => None,
                })
                .collect();
            let count = types.len();
            let args: Vec<_> = (0..count).map(|i| format_ident!("arg{}", i)).collect();
            let indexes = 0..count;
            vec.push(quote! {
                #name => {
                    let [#(#args),*] = ::courier::codegen::take_parameters::<#count>(method, parameters)?;
                    #(
                        let #args: #types = ::courier::codegen::from_parameter(method, #indexes, #args)?;
                    )*
                    ::courier::codegen::into_response(<Self as #trait_path>::#ident(self, #(#args),*))
                }
            });
        }
        vec
    });

    Ok(quote! {
        #item_impl

        impl #impl_generics ::courier::RpcService for #self_ty #where_clause {
            fn interface_name(&self) -> &str {
                <Self as #trait_path>::__courier_interface_name()
            }

            fn methods(&self) -> ::std::vec::Vec<::courier::MethodDescriptor> {
                <Self as #trait_path>::__courier_methods()
            }

            fn invoke(
                &self,
                method: &str,
                parameters: ::std::vec::Vec<::courier::codegen::Value>,
            ) -> ::std::result::Result<::courier::codegen::Value, ::courier::RemoteError> {
                match method {
                    #(#arms)*
                    _ => Err(::courier::RemoteError::method_not_found(
                        <Self as #trait_path>::__courier_interface_name(),
                        method,
                        &[],
                    )),
                }
            }
        }
    })
}
