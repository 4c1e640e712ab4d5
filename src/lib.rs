pub mod api;
pub mod core;
// `mod frb_generated;` 由 flutter_rust_bridge_codegen 在宿主构建时生成并加入

pub fn init_logging() {
    #[cfg(target_os = "android")]
    {
        android_logger::init_once(
            android_logger::Config::default()
                .with_max_level(log::LevelFilter::Debug)
                .with_tag("face_capture_rust"),
        );
    }

    #[cfg(not(target_os = "android"))]
    {
        // the host installs its own `log` backend
    }
}
