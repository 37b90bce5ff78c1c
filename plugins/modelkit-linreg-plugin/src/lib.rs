//! Multiple linear regression for modelkit
//!
//! Registers the `linreg` model with a [`ModelRegistry`]:
//!
//! ```yaml
//! model: linreg
//! config:
//!   location: ~/.cache/modelkit/models
//!   features: [f1:float:1, f2:float:1]
//!   predict: ans:float:1
//!   ridge: 0.0
//! ```

mod linreg;

pub use linreg::{fit, Coefficients, LinReg, LinRegConfig, LinRegModel, LinRegState};

use modelkit_models::{ModelPlugin, ModelRegistry};

/// Plugin registering [`LinReg`]
#[derive(Debug, Default, Clone, Copy)]
pub struct LinRegPlugin;

impl ModelPlugin for LinRegPlugin {
    fn name(&self) -> &str {
        "linreg"
    }

    fn register(&self, registry: &mut ModelRegistry) {
        registry.register::<LinReg>();
    }
}
