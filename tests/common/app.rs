use std::sync::Arc;

use axum::Router;
use tempfile::TempDir;
use tokio::sync::broadcast;

use wordflow_backend::config::Config;
use wordflow_backend::routes::build_router;
use wordflow_backend::state::AppState;
use wordflow_backend::store::Store;

pub struct TestApp {
    pub app: Router,
    pub state: AppState,
    _temp_dir: TempDir,
}

pub async fn spawn_test_server() -> TestApp {
    let temp_dir = tempfile::tempdir().expect("tempdir");
    let sled_path = temp_dir.path().join("wordflow-test.sled");

    let mut config = Config::from_env();
    config.sled_path = sled_path.to_string_lossy().to_string();

    let store = Arc::new(Store::open(&config.sled_path).expect("open store"));
    store.run_migrations().expect("run migrations");

    let (shutdown_tx, _) = broadcast::channel::<()>(8);
    let state = AppState::new(store, &config, shutdown_tx);
    let app = build_router(state.clone());

    TestApp {
        app,
        state,
        _temp_dir: temp_dir,
    }
}
