pub use self::{action::*, direction::*, observation::*, position::*};

pub(crate) mod action;
pub(crate) mod direction;
pub(crate) mod observation;
pub(crate) mod position;
