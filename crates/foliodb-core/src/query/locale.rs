//! Locale resolution.

use crate::{
    error::Error,
    query::{LocaleParam, Params, PipelineCtx},
    store::LocaleLookup,
    types::Locale,
};

/// Resolve the request locale against the schema and registry default
/// and translate it into a storage filter.
pub fn resolve_locale(ctx: &PipelineCtx<'_>, mut params: Params) -> Result<Params, Error> {
    if !ctx.schema.options.localized {
        // Non-localized entries are stored with a null locale column.
        params.locale = LocaleParam::Default;
        params.lookup.locale = Some(LocaleLookup::Is(None));
        return Ok(params);
    }

    match std::mem::take(&mut params.locale) {
        LocaleParam::Default => {
            let locale = Locale::new(ctx.registry.default_locale());
            params.lookup.locale = Some(LocaleLookup::Is(Some(locale.clone())));
            params.locale = LocaleParam::One(locale);
        }
        LocaleParam::All => {
            params.locale = LocaleParam::All;
        }
        LocaleParam::One(locale) => {
            params.lookup.locale = Some(LocaleLookup::Is(Some(locale.clone())));
            params.locale = LocaleParam::One(locale);
        }
        LocaleParam::Many(locales) => {
            params.lookup.locale = Some(LocaleLookup::In(locales.clone()));
            params.locale = LocaleParam::Many(locales);
        }
    }

    Ok(params)
}

/// Cross-locale variant used by publish-style operations: a locale list
/// becomes an `IN` lookup, no default is injected, and no status filter
/// is implied.
pub fn resolve_locale_list(ctx: &PipelineCtx<'_>, mut params: Params) -> Result<Params, Error> {
    if !ctx.schema.options.localized {
        params.locale = LocaleParam::Default;
        params.lookup.locale = Some(LocaleLookup::Is(None));
        return Ok(params);
    }

    match std::mem::take(&mut params.locale) {
        // Absent means every locale the document currently has.
        LocaleParam::All | LocaleParam::Default => {
            params.locale = LocaleParam::All;
        }
        LocaleParam::One(locale) => {
            params.lookup.locale = Some(LocaleLookup::In(vec![locale.clone()]));
            params.locale = LocaleParam::Many(vec![locale]);
        }
        LocaleParam::Many(locales) => {
            params.lookup.locale = Some(LocaleLookup::In(locales.clone()));
            params.locale = LocaleParam::Many(locales);
        }
    }

    Ok(params)
}

/// On write, copy the resolved locale into the payload; the entry
/// service lifts it back out into the locale column.
pub fn copy_locale_into_data(ctx: &PipelineCtx<'_>, mut params: Params) -> Result<Params, Error> {
    if !ctx.schema.options.localized {
        return Ok(params);
    }

    if let (LocaleParam::One(locale), Some(data)) = (&params.locale, params.data.as_mut()) {
        data.insert(
            "locale".to_string(),
            serde_json::Value::String(locale.as_str().to_string()),
        );
    }

    Ok(params)
}

// ----------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------
