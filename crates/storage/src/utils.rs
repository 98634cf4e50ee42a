// Copyright 2025 New Vector Ltd.
//
// SPDX-License-Identifier: AGPL-3.0-only OR LicenseRef-Element-Commercial
// Please see LICENSE files in the repository root for full details.

//! Error mapping for repositories

/// A repository whose errors go through a mapper function
///
/// Backends wrap themselves in it to erase their error type into a
/// [`RepositoryError`](crate::RepositoryError) before being boxed.
pub struct MapErr<R, F> {
    pub(crate) inner: R,
    pub(crate) mapper: F,
}

impl<R, F> MapErr<R, F> {
    /// Wrap `inner`, passing every error it returns through `mapper`
    #[must_use]
    pub const fn new(inner: R, mapper: F) -> Self {
        Self { inner, mapper }
    }
}

/// Implement a repository trait for [`Box<R>`] and for [`MapErr`], given the
/// list of its methods
///
/// Every method must take `&mut self` and return `Result<_, Self::Error>`.
#[macro_export]
macro_rules! repository_impl {
    ($repo_trait:ident:
        $(
            async fn $method:ident (
                &mut self
                $(, $arg:ident: $arg_ty:ty )*
                $(,)?
            ) -> Result<$ret_ty:ty, Self::Error>;
        )*
    ) => {
        #[::async_trait::async_trait]
        impl<R> $repo_trait for ::std::boxed::Box<R>
        where
            R: $repo_trait + ?Sized,
        {
            type Error = R::Error;

            $(
                async fn $method (&mut self $(, $arg: $arg_ty)*) -> Result<$ret_ty, Self::Error> {
                    R::$method(&mut **self $(, $arg)*).await
                }
            )*
        }

        #[::async_trait::async_trait]
        impl<R, F, E> $repo_trait for $crate::MapErr<R, F>
        where
            R: $repo_trait,
            F: FnMut(R::Error) -> E + ::std::marker::Send + ::std::marker::Sync,
        {
            type Error = E;

            $(
                async fn $method (&mut self $(, $arg: $arg_ty)*) -> Result<$ret_ty, Self::Error> {
                    let result = self.inner.$method($($arg),*).await;
                    result.map_err(|error| (self.mapper)(error))
                }
            )*
        }
    };
}
