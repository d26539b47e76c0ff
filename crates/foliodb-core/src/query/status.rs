//! Status resolution.

use crate::{
    error::Error,
    query::{Params, PipelineCtx},
    types::Status,
};

/// Default a missing `status` to draft and translate it into the
/// `published_at` storage filter. Schemas without draft-and-publish
/// store every entry as published and take no status filter at all.
pub fn resolve_status(ctx: &PipelineCtx<'_>, mut params: Params) -> Result<Params, Error> {
    if !ctx.schema.options.draft_and_publish {
        params.status = None;
        params.lookup.published = None;
        return Ok(params);
    }

    let status = params.status.unwrap_or_default();
    params.status = Some(status);
    params.lookup.published = Some(status.is_published());

    Ok(params)
}

// ----------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::resolve_status;
    use crate::{
        query::{Params, PipelineCtx, tests::resolved},
        types::Status,
    };

    #[test]
    fn missing_status_defaults_to_draft() {
        let registry = resolved();
        let schema = registry
            .content_type(&"api::article".into())
            .expect("article should resolve");
        let ctx = PipelineCtx {
            registry: &registry,
            schema,
            default_page_size: 100,
        };

        let params = resolve_status(&ctx, Params::new()).expect("transform should apply");
        assert_eq!(params.status, Some(Status::Draft));
        assert_eq!(params.lookup.published, Some(false));
    }

    #[test]
    fn published_status_flips_the_lookup() {
        let registry = resolved();
        let schema = registry
            .content_type(&"api::article".into())
            .expect("article should resolve");
        let ctx = PipelineCtx {
            registry: &registry,
            schema,
            default_page_size: 100,
        };

        let params = resolve_status(&ctx, Params::new().with_status(Status::Published))
            .expect("transform should apply");
        assert_eq!(params.lookup.published, Some(true));
    }
}
