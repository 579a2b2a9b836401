//! Update pipeline: coerce, write the field, dispatch handlers.
//!
//! Shared by default application, the snapshot loader, watchers and manual
//! updates. Handlers run synchronously on the caller, in declaration order,
//! and only after the new value is visible to readers.

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::binding::Binding;
use crate::coerce::CoercionError;
use crate::observability::metrics;

/// Apply `text` to the binding's field.
///
/// On a coercion failure nothing is written and no handler runs.
pub(crate) fn apply<T>(
    binding: &Binding<T>,
    state: &ArcSwap<T>,
    text: &str,
) -> Result<Arc<T>, CoercionError> {
    let config = match (binding.setter)(state, text) {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(
                key = %binding.key,
                kind = binding.kind,
                error = %e,
                "Rejected value, keeping previous"
            );
            metrics::record_coercion_failure(&binding.key);
            return Err(e);
        }
    };

    metrics::record_update(&binding.key);
    tracing::debug!(key = %binding.key, handlers = binding.handlers.len(), "Field updated");

    for handler in &binding.handlers {
        handler(&config, &binding.local_key, text);
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{Field, SchemaBuilder};
    use std::sync::Mutex;

    #[derive(Clone, Debug, Default)]
    struct Cfg {
        port: Option<i32>,
    }

    #[test]
    fn test_apply_writes_then_notifies() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let schema = SchemaBuilder::<Cfg>::new()
            .namespace("App")
            .field(
                Field::bind("api-port", |c: &mut Cfg| &mut c.port).on_change(
                    move |cfg: &Cfg, key: &str, value: &str| {
                        sink.lock().unwrap().push((cfg.port, key.to_string(), value.to_string()));
                    },
                ),
            )
            .build()
            .unwrap();
        let binding = schema.table().lookup("App/api-port").unwrap();
        let state = ArcSwap::from_pointee(Cfg::default());

        let cfg = apply(binding, &state, "9090").unwrap();
        assert_eq!(cfg.port, Some(9090));
        assert_eq!(state.load().port, Some(9090));
        assert_eq!(
            *seen.lock().unwrap(),
            vec![(Some(9090), "api-port".to_string(), "9090".to_string())]
        );
    }

    #[test]
    fn test_rejected_value_skips_handlers() {
        let calls = Arc::new(Mutex::new(0));
        let counter = Arc::clone(&calls);
        let schema = SchemaBuilder::<Cfg>::new()
            .field(
                Field::bind("api-port", |c: &mut Cfg| &mut c.port)
                    .on_change(move |_: &Cfg, _: &str, _: &str| *counter.lock().unwrap() += 1),
            )
            .build()
            .unwrap();
        let binding = schema.table().lookup("api-port").unwrap();
        let state = ArcSwap::from_pointee(Cfg { port: Some(80) });

        let err = apply(binding, &state, "eighty").unwrap_err();
        assert_eq!(err.kind, "integer");
        assert_eq!(state.load().port, Some(80));
        assert_eq!(*calls.lock().unwrap(), 0);
    }
}
