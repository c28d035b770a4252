//! Search command

use anyhow::{Result, anyhow};
use crossterm::style::Stylize;
use pkgdex_core::index::{
    ManifestProperty, MatchType, PackageMatchField, PackageMatchFilter, SearchRequest,
};
use pkgdex_core::{OpenDisposition, PackageIndex};

use super::Context;
use crate::ui::Theme;

#[derive(Debug, Clone, Default)]
pub struct SearchArgs {
    pub query: Option<String>,
    pub match_type: MatchType,
    pub inclusions: Vec<String>,
    pub filters: Vec<String>,
    pub count: Option<usize>,
    pub json: bool,
}

/// Parse `field=value` into a filter using `match_type`.
fn parse_filter(spec: &str, match_type: MatchType) -> Result<PackageMatchFilter> {
    let (field, value) = spec
        .split_once('=')
        .ok_or_else(|| anyhow!("Expected FIELD=VALUE, got '{spec}'"))?;
    let field: PackageMatchField = field.trim().parse().map_err(|e: String| anyhow!(e))?;
    Ok(PackageMatchFilter::new(field, match_type, value.trim()))
}

fn build_request(args: &SearchArgs) -> Result<SearchRequest> {
    let mut request = match &args.query {
        Some(query) => SearchRequest::query(args.match_type, query.as_str()),
        None => SearchRequest::default(),
    };
    for spec in &args.inclusions {
        request = request.with_inclusion(parse_filter(spec, args.match_type)?);
    }
    for spec in &args.filters {
        request = request.with_filter(parse_filter(spec, args.match_type)?);
    }
    Ok(request.with_maximum_results(args.count.unwrap_or(0)))
}

/// Latest version and display name of a package.
fn describe(index: &PackageIndex, id: &str) -> Result<(String, String)> {
    let Some(latest) = index.get_versions(id)?.into_iter().next() else {
        return Ok((String::new(), String::new()));
    };
    let name = index
        .get_property(latest.manifest, ManifestProperty::Name)?
        .unwrap_or_default();
    Ok((latest.version, name))
}

/// Search the index and list matching packages.
pub fn search(ctx: &Context, args: &SearchArgs) -> Result<()> {
    let start = std::time::Instant::now();
    let index = ctx.open_index(OpenDisposition::ReadOnly)?;
    let request = build_request(args)?;
    let result = index.search(&request)?;

    if args.json {
        let mut entries = Vec::with_capacity(result.matches.len());
        for m in &result.matches {
            let (version, name) = describe(&index, &m.id)?;
            entries.push(serde_json::json!({
                "id": m.id,
                "name": name,
                "version": version,
                "matched": m.matched.as_ref().map(|f| f.field.as_str()),
            }));
        }
        let output = serde_json::json!({
            "matches": entries,
            "truncated": result.truncated,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let theme = Theme::default();
    if result.matches.is_empty() {
        println!();
        println!(
            "  {} No packages found{}",
            theme.icons.info.blue(),
            args.query
                .as_deref()
                .map(|q| format!(" matching '{q}'"))
                .unwrap_or_default()
        );
        println!();
        return Ok(());
    }

    println!();
    for m in &result.matches {
        let (version, name) = describe(&index, &m.id)?;
        let matched = m
            .matched
            .as_ref()
            .map(|f| format!("[{}]", f.field))
            .unwrap_or_default();
        let id_part = format!("{:<width$}", m.id, width = theme.id_width);
        let version_part = format!("{version:<12}");
        println!(
            "  {} {} {} {}",
            id_part.with(theme.colors.package_name),
            version_part.with(theme.colors.version),
            name.as_str().with(theme.colors.secondary),
            matched.as_str().with(theme.colors.secondary),
        );
    }

    println!();
    println!(
        "SEARCH COMPLETE {}{}, elapsed {:.2}s",
        result.matches.len(),
        if result.truncated { " (truncated)" } else { "" },
        start.elapsed().as_secs_f64()
    );
    Ok(())
}
