//! Rows-per-page setup.
//!
//! The server table paginates, so names past the first page cannot be located.
//! After every page load the table is switched to show all rows, trying the
//! footer dropdowns of both Vuetify generations, a plain `select`, and finally
//! a script that sets the page size directly.

use crate::config::ExtractionSettings;
use crate::error_handling::SessionError;
use crate::session::{first_displayed, ActivationMethod, BrowserSession, Key, Locator};
use crate::utils::poll_until;

/// Rows-per-page dropdowns by UI generation, in the order they are tried.
pub const ROWS_PER_PAGE_DROPDOWNS: &[(&str, &[&str])] = &[
    (
        "vuetify-3 footer",
        &[
            ".v-data-table-footer__items-per-page .v-select",
            ".v-data-table__footer .v-select",
            ".v-table__footer .v-select",
        ],
    ),
    (
        "vuetify-2 footer",
        &[
            ".v-data-footer__select .v-select",
            ".v-datatable__actions .v-select",
            ".v-data-table-footer .v-select",
        ],
    ),
    (
        "plain select",
        &[
            "select[aria-label*='per page']",
            "select[aria-label*='rows']",
            ".per-page-select",
            ".rows-per-page select",
        ],
    ),
];

/// The "All" entry of an opened rows-per-page menu.
pub const ALL_ROWS_OPTIONS: &[&str] = &[
    "//div[contains(@class, 'v-list-item-title') and (normalize-space(.)='All' or normalize-space(.)='Все')]",
    "//div[contains(@class, 'v-list-item__title') and (normalize-space(.)='All' or normalize-space(.)='Все')]",
    "//div[contains(@class, 'v-list__tile__title') and (normalize-space(.)='All' or normalize-space(.)='Все' or normalize-space(.)='-1')]",
    "//li[normalize-space(.)='All' or normalize-space(.)='Все']",
    "//option[normalize-space(.)='All' or normalize-space(.)='Все' or @value='-1']",
];

/// Name reported when the page size was set by script.
pub const SCRIPT_PAGINATION: &str = "script";

/// Sets the table's page size to -1 through the Vue instance or any `select`
/// offering an "All" option. Returns whether anything was changed.
pub const SELECT_ALL_ROWS_SCRIPT: &str = r#"
let changed = false;
const app = document.querySelector('[data-app]');
const vm = app && app.__vue__;
if (vm && vm.$data) {
  if ('itemsPerPage' in vm.$data) { vm.$data.itemsPerPage = -1; changed = true; }
  if (vm.$data.pagination) { vm.$data.pagination.rowsPerPage = -1; changed = true; }
}
for (const select of document.querySelectorAll('select')) {
  for (let i = select.options.length - 1; i >= 0; i--) {
    const option = select.options[i];
    if (option.value === '-1' || option.text.includes('All')) {
      select.selectedIndex = i;
      select.dispatchEvent(new Event('change', { bubbles: true }));
      changed = true;
      break;
    }
  }
}
return changed;
"#;

async fn find_all_rows_option<S: BrowserSession + ?Sized>(
    session: &S,
) -> Result<Option<S::Element>, SessionError> {
    for xpath in ALL_ROWS_OPTIONS {
        match first_displayed(session, &Locator::xpath(*xpath)).await {
            Ok(Some(option)) => return Ok(Some(option)),
            Ok(None) => {}
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => log::debug!("Rows option lookup failed: {}", e),
        }
    }
    Ok(None)
}

/// Opens the first displayed dropdown among `selectors` and picks "All".
async fn pick_from_dropdown<S: BrowserSession + ?Sized>(
    session: &S,
    selectors: &[&str],
    settings: &ExtractionSettings,
) -> Result<bool, SessionError> {
    for selector in selectors {
        let Some(dropdown) = first_displayed(session, &Locator::css(*selector)).await? else {
            continue;
        };
        session
            .activate(&dropdown, ActivationMethod::PointerClick)
            .await?;
        let option = poll_until(
            settings.strategy_probe_timeout,
            settings.poll_interval,
            move || async move { find_all_rows_option(session).await },
        )
        .await?;
        match option {
            Some(option) => {
                session
                    .activate(&option, ActivationMethod::NativeClick)
                    .await?;
                return Ok(true);
            }
            None => {
                log::debug!("Dropdown {} has no \"All\" entry", selector);
                session.press_key(Key::Escape).await?;
            }
        }
    }
    Ok(false)
}

/// Switches the results table to show every row.
///
/// # Returns
///
/// The name of the strategy that took effect, or `None` when none did. A table
/// that stays paginated is not an error; only fatal session errors are
/// returned.
pub async fn select_all_rows<S: BrowserSession + ?Sized>(
    session: &S,
    settings: &ExtractionSettings,
) -> Result<Option<&'static str>, SessionError> {
    let mut applied = None;

    for (name, selectors) in ROWS_PER_PAGE_DROPDOWNS {
        match pick_from_dropdown(session, selectors, settings).await {
            Ok(true) => {
                applied = Some(*name);
                break;
            }
            Ok(false) => {}
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => log::debug!("Rows-per-page via {} failed: {}", name, e),
        }
    }

    if applied.is_none() {
        match session.eval_bool(SELECT_ALL_ROWS_SCRIPT).await {
            Ok(true) => applied = Some(SCRIPT_PAGINATION),
            Ok(false) => {}
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => log::debug!("Rows-per-page script failed: {}", e),
        }
    }

    match applied {
        Some(name) => {
            log::info!("Results table set to show all rows ({})", name);
            settings.pagination_settle.wait().await;
        }
        None => log::warn!("Could not set the results table to show all rows"),
    }
    Ok(applied)
}
