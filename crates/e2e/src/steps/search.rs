//! Steps for the search flow

use stepwright_report::StepContext;

use crate::components::SearchResult;
use crate::data::ExpectedResults;
use crate::error::{E2eError, E2eResult};
use crate::pages::SearchPage;

/// `Perform search for "<query>"` with children `Open page` and `Submit query`
pub async fn perform_search(ctx: &StepContext, page: &SearchPage, query: &str) -> E2eResult<()> {
    ctx.step(format!("Perform search for \"{}\"", query), |ctx| async move {
        ctx.step("Open page", |_| page.open()).await?;
        ctx.step("Submit query", |_| page.search(query)).await
    })
    .await
}

/// Wait for the result list and read up to `limit` results.
///
/// The results are attached to the step as JSON.
pub async fn read_results(
    ctx: &StepContext,
    page: &SearchPage,
    limit: usize,
) -> E2eResult<Vec<SearchResult>> {
    ctx.step("Read results", |ctx| async move {
        ctx.step("Wait for results", |_| page.wait_for_results()).await?;
        let results = page.results(limit).await?;
        ctx.attachment("results", serde_json::to_vec_pretty(&results)?, "application/json");
        Ok::<_, E2eError>(results)
    })
    .await
}

/// One child step per expectation; the first unmet one fails the step
pub async fn verify_results(
    ctx: &StepContext,
    page: &SearchPage,
    results: &[SearchResult],
    expected: &ExpectedResults,
) -> E2eResult<()> {
    ctx.step("Verify results", |ctx| async move {
        if let Some(min) = expected.min_results {
            ctx.step_sync(format!("At least {} result(s)", min), |_| {
                if results.len() >= min {
                    Ok(())
                } else {
                    Err(E2eError::AssertionFailed(format!(
                        "expected at least {} result(s), found {}",
                        min,
                        results.len()
                    )))
                }
            })?;
        }

        for needle in &expected.title_contains {
            ctx.step_sync(format!("A result title contains \"{}\"", needle), |_| {
                let lowered = needle.to_lowercase();
                if results.iter().any(|r| r.title.to_lowercase().contains(&lowered)) {
                    Ok(())
                } else {
                    Err(E2eError::AssertionFailed(format!(
                        "no result title contains \"{}\" (titles: {:?})",
                        needle,
                        results.iter().map(|r| r.title.as_str()).collect::<Vec<_>>()
                    )))
                }
            })?;
        }

        if let Some(fragment) = &expected.url_contains {
            ctx.step(format!("Results URL contains \"{}\"", fragment), |_| async move {
                let url = page.current_url().await?;
                if url.contains(fragment.as_str()) {
                    Ok(())
                } else {
                    Err(E2eError::AssertionFailed(format!(
                        "URL {} does not contain \"{}\"",
                        url, fragment
                    )))
                }
            })
            .await?;
        }

        Ok::<_, E2eError>(())
    })
    .await
}
