//! Engine configuration is process-wide, so it gets its own test binary.

use trellis_core::backend::NativeBackend;
use trellis_core::reactive::{Effect, EngineConfig, EngineError, Runtime, Signal};
use trellis_core::{Facade, WatchOptions};

#[test]
fn configured_depth_limits_runaway_effects() {
    let config = EngineConfig::from_json(r#"{ "max_update_depth": 5 }"#).unwrap();
    let rx = Facade::new(NativeBackend::with_config(config));
    assert_eq!(Runtime::config().max_update_depth, 5);
    assert!(Runtime::config().warn_detached);

    // Each run bumps the value it depends on, re-triggering itself
    let value = rx.use_prop(0);
    let writer = value.clone();
    rx.do_watch(move || writer.set(writer.get() + 1), WatchOptions::new());
    assert_eq!(value.get(), 5);

    // At the limit an explicit run reports why it was refused
    let signal = Signal::new(0);
    let reader = signal.clone();
    let effect = Effect::new_lazy(move || {
        reader.get();
    });
    let guards: Vec<_> = (0..5).map(|_| Runtime::enter_update().unwrap()).collect();
    assert_eq!(
        effect.try_execute(),
        Err(EngineError::UpdateDepthExceeded { depth: 5 })
    );
    drop(guards);

    assert_eq!(effect.try_execute(), Ok(()));
    assert_eq!(effect.run_count(), 1);
    effect.dispose();
}
