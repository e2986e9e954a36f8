//! Builds one generation of [`AppInfo`] records from the upstream listings.
//!
//! The three listings are fetched concurrently. A failed listing is logged and
//! treated as empty, so a partial outage degrades the dataset instead of
//! aborting the rebuild. Lookup tables only live for the duration of a rebuild.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::{AppInfo, Application, InventorySource, Organization, Space};
use crate::utils::{fmt_duration, log_if_slow};

const SLOW_REBUILD_THRESHOLD: Duration = Duration::from_secs(30);

/// Space name and the name of its owning org, borrowed from the listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SpaceNames<'a> {
    pub(crate) name: &'a str,
    pub(crate) org_name: &'a str,
}

/// org GUID → org name
pub(crate) fn org_lookup(orgs: &[Organization]) -> HashMap<&str, &str> {
    orgs.iter()
        .map(|org| (org.guid.as_str(), org.name.as_str()))
        .collect()
}

/// space GUID → (space name, org name). Unknown orgs resolve to `""`.
pub(crate) fn space_lookup<'a>(
    spaces: &'a [Space],
    orgs: &HashMap<&'a str, &'a str>,
) -> HashMap<&'a str, SpaceNames<'a>> {
    spaces
        .iter()
        .map(|space| {
            let org_name = orgs.get(space.org_guid.as_str()).copied().unwrap_or("");
            (
                space.guid.as_str(),
                SpaceNames {
                    name: space.name.as_str(),
                    org_name,
                },
            )
        })
        .collect()
}

/// Resolve every application's space and org names.
///
/// Output order follows `apps`. Apps referencing an unknown space get empty
/// `space` and `org` fields.
pub fn resolve(apps: Vec<Application>, orgs: &[Organization], spaces: &[Space]) -> Vec<AppInfo> {
    let orgs = org_lookup(orgs);
    let spaces = space_lookup(spaces, &orgs);

    apps.into_iter()
        .map(|app| {
            let names = spaces.get(app.space_guid.as_str()).copied();
            AppInfo {
                name: app.name,
                guid: app.guid,
                space: names.map(|n| n.name).unwrap_or_default().to_owned(),
                org: names.map(|n| n.org_name).unwrap_or_default().to_owned(),
            }
        })
        .collect()
}

/// Fetch all listings from `source` and build a fresh dataset.
///
/// Never fails: each listing that errors is logged and replaced by an empty list.
pub async fn rebuild(source: &dyn InventorySource) -> Vec<AppInfo> {
    let start = Instant::now();
    debug!("Generating fresh app map");

    let (apps, orgs, spaces) = tokio::join!(
        source.list_apps(),
        source.list_organizations(),
        source.list_spaces()
    );

    let apps = apps.unwrap_or_else(|e| {
        warn!(error = ?e, "Failed to list apps, continuing with none");
        Vec::new()
    });
    let orgs = orgs.unwrap_or_else(|e| {
        warn!(error = ?e, "Failed to list organizations, continuing with none");
        Vec::new()
    });
    let spaces = spaces.unwrap_or_else(|e| {
        warn!(error = ?e, "Failed to list spaces, continuing with none");
        Vec::new()
    });

    let (app_count, org_count, space_count) = (apps.len(), orgs.len(), spaces.len());
    let dataset = resolve(apps, &orgs, &spaces);

    info!(
        apps = app_count,
        orgs = org_count,
        spaces = space_count,
        elapsed = fmt_duration(start.elapsed()),
        "App map generated"
    );
    log_if_slow(start, SLOW_REBUILD_THRESHOLD, "app map rebuild");

    dataset
}
