//! Macros for declaring state frames.

/// Declare [`StateFrame`](crate::core::StateFrame) constants.
///
/// Append `, final` to mark a state as terminal.
///
/// # Example
///
/// ```
/// use durafsm::frames;
///
/// frames! {
///     pub INIT = 0;
///     pub CREATED = 1;
///     pub CREATE_FAILED = 2, final;
///     pub RUNNING = 4, final;
/// }
///
/// assert!(CREATE_FAILED.is_final());
/// assert_eq!(RUNNING.state, 4);
/// ```
#[macro_export]
macro_rules! frames {
    () => {};

    (
        $(#[$meta:meta])*
        $vis:vis $name:ident = $state:expr, final;
        $($rest:tt)*
    ) => {
        $(#[$meta])*
        $vis const $name: $crate::core::StateFrame = $crate::core::StateFrame::terminal($state);
        $crate::frames! { $($rest)* }
    };

    (
        $(#[$meta:meta])*
        $vis:vis $name:ident = $state:expr;
        $($rest:tt)*
    ) => {
        $(#[$meta])*
        $vis const $name: $crate::core::StateFrame = $crate::core::StateFrame::new($state);
        $crate::frames! { $($rest)* }
    };
}
