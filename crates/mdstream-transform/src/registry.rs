//! Maps each [`TransformKind`] to a constructor.

use indexmap::IndexMap;

use crate::error::ResolveError;
use crate::kind::TransformKind;
use crate::transformation::Transformation;

/// Builds a fresh transformation instance.
pub type Constructor = fn() -> Box<dyn Transformation>;

/// Startup-populated table of transformation constructors.
#[derive(Clone, Default)]
pub struct Registry {
    constructors: IndexMap<TransformKind, Constructor>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.constructors.keys()).finish()
    }
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the constructor for `kind`.
    pub fn register(&mut self, kind: TransformKind, constructor: Constructor) -> &mut Self {
        if self.constructors.insert(kind, constructor).is_some() {
            tracing::debug!(%kind, "replaced registered transformation");
        }
        self
    }

    /// Whether `kind` has a constructor.
    pub fn contains(&self, kind: TransformKind) -> bool {
        self.constructors.contains_key(&kind)
    }

    /// Build a new instance of `kind`.
    pub fn build(&self, kind: TransformKind) -> Result<Box<dyn Transformation>, ResolveError> {
        self.constructors
            .get(&kind)
            .map(|ctor| ctor())
            .ok_or(ResolveError::Unregistered { kind })
    }

    /// Registered kinds, in registration order.
    pub fn kinds(&self) -> impl Iterator<Item = TransformKind> + '_ {
        self.constructors.keys().copied()
    }

    /// Number of registered kinds.
    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    /// Whether nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransformError;
    use crate::transformation::{PropertyBatch, TransformContext};
    use mdstream_core::{Array3, PropertyInfo};

    struct Noop;

    impl Transformation for Noop {
        fn name(&self) -> &str {
            "noop"
        }

        fn inputs(&self) -> Vec<String> {
            Vec::new()
        }

        fn output(&self) -> PropertyInfo {
            PropertyInfo::new("Ionic_Current", 3)
        }

        fn transform_batch(
            &mut self,
            batch: &PropertyBatch,
            ctx: &TransformContext<'_>,
        ) -> Result<Array3, TransformError> {
            Ok(Array3::zeros(self.output_shape(ctx.species, batch.size())))
        }
    }

    fn noop() -> Box<dyn Transformation> {
        Box::new(Noop)
    }

    #[test]
    fn build_registered_kind() {
        let mut registry = Registry::new();
        registry.register(TransformKind::IonicCurrent, noop);
        assert!(registry.contains(TransformKind::IonicCurrent));
        assert_eq!(registry.build(TransformKind::IonicCurrent).unwrap().name(), "noop");
    }

    #[test]
    fn unregistered_kind_is_an_error() {
        let registry = Registry::new();
        assert!(registry.is_empty());
        assert!(matches!(
            registry.build(TransformKind::MomentumFlux),
            Err(ResolveError::Unregistered {
                kind: TransformKind::MomentumFlux
            })
        ));
    }
}
