/// Pages that are not built yet

use crate::app::Route;
use crate::routes::{header, View};
use lexdesk_session::AuthSnapshot;
use serde_json::json;

/// "Under construction" message of a placeholder page
pub fn message(route: &Route) -> Option<&'static str> {
    match route {
        Route::Documents => Some("Página de Documentos em desenvolvimento"),
        Route::Calendar => Some("Página de Agenda em desenvolvimento"),
        Route::Reports => Some("Página de Relatórios em desenvolvimento"),
        Route::Settings => Some("Página de Configurações em desenvolvimento"),
        _ => None,
    }
}

pub fn show(snapshot: &AuthSnapshot, route: &Route) -> View {
    let message = message(route).unwrap_or_default();

    let mut text = header(snapshot, route.title());
    text.push('\n');
    text.push_str(message);
    text.push('\n');

    View::new(
        text,
        json!({ "route": route.path(), "message": message }),
    )
}
