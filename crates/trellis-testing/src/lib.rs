//! Testing utilities and harness for Trellis

pub mod testing;

pub use testing::*;

pub mod prelude {
    pub use crate::testing::*;
    pub use trellis_core::{
        create_element, deps, nodes, use_callback, use_effect, use_memo, use_ref, use_state,
        Component, EffectResult, EffectScope, Event, Node, PropValue, Props, RenderError,
        RuntimeOptions, FRAGMENT,
    };
}
