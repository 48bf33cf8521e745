//! Page actions
//!
//! Tagged interaction steps replayed in order against a page. Unknown
//! tags deserialize to [`Action::Unknown`] and are skipped with a
//! warning instead of failing the task.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::session::PageSession;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Action {
    Click {
        selector: String,
    },
    Type {
        selector: String,
        value: String,
    },
    Wait {
        duration: u64,
    },
    Scroll {
        value: f64,
    },
    MoveMouse {
        x: f64,
        y: f64,
    },
    Hover {
        selector: String,
    },
    #[serde(rename_all = "camelCase")]
    DragAndDrop {
        source_selector: String,
        target_selector: String,
    },
    #[serde(other)]
    Unknown,
}

/// Replay `actions` in order against `page`
pub async fn run_actions(page: &Arc<dyn PageSession>, actions: &[Action]) -> Result<()> {
    for action in actions {
        debug!("Running action {:?}", action);
        match action {
            Action::Click { selector } => page.click(selector).await?,
            Action::Type { selector, value } => page.type_text(selector, value, 0).await?,
            Action::Wait { duration } => {
                tokio::time::sleep(tokio::time::Duration::from_millis(*duration)).await
            }
            Action::Scroll { value } => page.scroll_by(0.0, *value).await?,
            Action::MoveMouse { x, y } => {
                page.cdp()
                    .dispatch_mouse_event("mouseMoved", *x, *y, None, None)
                    .await?
            }
            Action::Hover { selector } => page.hover(selector).await?,
            Action::DragAndDrop {
                source_selector,
                target_selector,
            } => drag_and_drop(page, source_selector, target_selector).await?,
            Action::Unknown => warn!("Unknown action type, skipping"),
        }
    }
    Ok(())
}

/// Press on the source element, glide to the target, release
async fn drag_and_drop(page: &Arc<dyn PageSession>, source: &str, target: &str) -> Result<()> {
    let (sx, sy) = page.element_center(source).await?;
    let (tx, ty) = page.element_center(target).await?;

    let cdp = page.cdp();
    cdp.dispatch_mouse_event("mouseMoved", sx, sy, None, None)
        .await?;
    cdp.dispatch_mouse_event("mousePressed", sx, sy, Some("left"), Some(1))
        .await?;
    cdp.dispatch_mouse_event("mouseMoved", tx, ty, Some("left"), None)
        .await?;
    cdp.dispatch_mouse_event("mouseReleased", tx, ty, Some("left"), Some(1))
        .await?;
    Ok(())
}
