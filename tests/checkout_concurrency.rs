mod common;

use storefront_api::{
    dto::{cart::AddToCartRequest, orders::CheckoutRequest},
    services::{cart_service, checkout_service},
    status::Role,
    store::{CatalogStore, NewProduct, OrderStore},
};
use uuid::Uuid;

use common::{pg_profile, pg_state};

const ROUNDS: usize = 25;

// Two requests carrying the same key race on Postgres row locks. The loser
// must get the winner's order back, never an empty-cart error.
#[tokio::test]
async fn concurrent_retries_with_same_key_share_one_order() -> anyhow::Result<()> {
    let Some((state, store)) = pg_state().await? else {
        return Ok(());
    };

    let client = pg_profile(&store, Role::Client, "client@example.com").await?;
    let product = store
        .insert_product(NewProduct {
            name: "Wallet".into(),
            description: None,
            price: 25_000,
            stock: 1_000,
            image_url: None,
            category_id: None,
        })
        .await?;

    for round in 0..ROUNDS {
        cart_service::add_to_cart(
            &state,
            &client,
            AddToCartRequest {
                product_id: product.id,
                quantity: 1,
            },
        )
        .await?;

        let key = Uuid::new_v4();
        let request = || CheckoutRequest {
            idempotency_key: Some(key),
        };
        let (first, second) = tokio::join!(
            checkout_service::checkout(&state, &client, request()),
            checkout_service::checkout(&state, &client, request()),
        );

        let first = first
            .map_err(|err| anyhow::anyhow!("round {round}: {err}"))?
            .data
            .expect("checkout data");
        let second = second
            .map_err(|err| anyhow::anyhow!("round {round}: {err}"))?
            .data
            .expect("checkout data");

        assert_eq!(first.order.id, second.order.id, "round {round}");
        assert_eq!(
            [first.replayed, second.replayed]
                .iter()
                .filter(|replayed| **replayed)
                .count(),
            1,
            "round {round}"
        );
    }

    assert_eq!(store.count_orders(None).await?, ROUNDS as u64);
    let remaining = store.get_product(product.id).await?.expect("product");
    assert_eq!(remaining.stock, 1_000 - ROUNDS as i32);
    Ok(())
}
