#![no_main]

use std::path::Path;

use libfuzzer_sys::fuzz_target;
use roisampler::config::ConfigLoader;
use roisampler::manager::Policy;

fuzz_target!(|data: &[u8]| {
    let Ok(yaml) = std::str::from_utf8(data) else {
        return;
    };

    // Anything the loader accepts must build a policy
    if let Ok(loaded) = ConfigLoader::with_defaults().load_str(yaml, Path::new("<fuzz>")) {
        assert!(Policy::from_config(&loaded.config.manager).is_ok());
    }
});
