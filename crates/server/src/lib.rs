pub mod error;
pub mod routes;

use services::services::asset_editor::AssetEditorService;
use storage::AssetStore;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub editor: AssetEditorService,
}

impl AppState {
    pub fn new(editor: AssetEditorService) -> Self {
        Self { editor }
    }

    pub fn store(&self) -> &AssetStore {
        self.editor.store()
    }
}
