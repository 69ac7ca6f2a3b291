//! Declarative macros for ergonomic effect construction

/// Create an `Effect::Future` from an async block
///
/// # Example
///
/// ```rust,ignore
/// use shopfront_core::async_effect;
///
/// async_effect! {
///     let products = catalog.fetch_all_products().await;
///     Some(CheckoutAction::CatalogFetched { products })
/// }
/// ```
#[macro_export]
macro_rules! async_effect {
    ($($body:tt)*) => {
        $crate::effect::Effect::Future(
            ::std::boxed::Box::pin(async move { $($body)* })
        )
    };
}

/// Create an `Effect::Cancellable` around an async block
///
/// Starting the effect aborts whatever is still running under the same id.
///
/// # Example
///
/// ```rust,ignore
/// use shopfront_core::cancellable_effect;
///
/// cancellable_effect! {
///     id: JOIN_EFFECT,
///     async {
///         let products = catalog.fetch_all_products().await;
///         Some(CheckoutAction::CatalogFetched { products })
///     }
/// }
/// ```
#[macro_export]
macro_rules! cancellable_effect {
    (
        id: $id:expr,
        async { $($body:tt)* }
    ) => {
        $crate::effect::Effect::Cancellable {
            id: $id,
            effect: ::std::boxed::Box::new($crate::async_effect! { $($body)* }),
        }
    };
}
