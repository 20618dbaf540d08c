pub mod pagination;
pub mod toast;

pub use pagination::{DisplayRange, NavAction, Paginator};
pub use toast::{Toast, ToastKind, ToastQueue};
