use std::any::type_name;
use std::future::Future;

use anyhow::Result;
use ft_domain::Meta;
use serde::Deserialize;
use tracing::{event, trace_span, Instrument, Level};

#[derive(Debug, Clone)]
pub struct PaginationInput {
    pub page: u32,
    pub limit: u32,
}

#[derive(Deserialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub meta: Meta,
}

pub async fn fetch_all_pages<T, F, Fut>(mut fetch_page: F) -> Result<Vec<T>>
where
    T: for<'de> Deserialize<'de>,
    F: FnMut(PaginationInput) -> Fut,
    Fut: Future<Output = Result<PaginatedResponse<T>>>,
{
    let initial_input = PaginationInput { page: 1, limit: 20 };

    let mut all_data = Vec::new();
    let mut current_input = initial_input;

    let output_parameter_type_name = type_name::<T>();

    let span = trace_span!("pagination");

    let mut total_number_of_pages = 1;

    async move {
        event!(Level::TRACE, "Start downloading all pages of type {}", output_parameter_type_name);

        while current_input.page <= total_number_of_pages {
            let response = fetch_page(current_input.clone()).await?;
            total_number_of_pages = (response.meta.total as f32 / response.meta.limit as f32).ceil() as u32;

            event!(Level::TRACE, "Downloaded page {} of {}", current_input.page, total_number_of_pages);

            all_data.extend(response.data);

            current_input.page += 1;
        }

        event!(Level::TRACE, "Done downloading all {} pages", total_number_of_pages);
        Ok(all_data)
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use ft_domain::Meta;

    #[tokio::test]
    async fn fetch_all_pages_walks_until_the_total_is_reached() {
        let pages = vec![vec![1, 2, 3], vec![4, 5, 6], vec![7]];

        let collected = fetch_all_pages(|input: PaginationInput| {
            let page = pages[(input.page - 1) as usize].clone();
            async move {
                Ok(PaginatedResponse {
                    data: page,
                    meta: Meta { total: 7, page: input.page, limit: 3 },
                })
            }
        })
        .await
        .unwrap();

        assert_eq!(collected, vec![1, 2, 3, 4, 5, 6, 7]);
    }
}
