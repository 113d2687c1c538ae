//! Transactions that move points, stock and statuses together.
//!
//! Every operation reads what it changes inside one [`Transaction`], so a
//! concurrent writer makes the commit fail and the body re-run on fresh data.
//! A body that returns an error writes nothing.

use alicia_authz::{AuthzError, Principal};
use alicia_db::{new_id, run_transaction, Entity, Query, StoreError, Transaction};
use alicia_kernel::settings::LoyaltySettings;
use alicia_kernel::AppContext;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::Serialize;
use serde_json::json;

use super::error::LedgerError;
use super::models::{AdjustRequest, LedgerEntry, LedgerReason, POINTS_LEDGER};
use super::pricing::{self, PriceBreakdown};
use crate::modules::books::models::{Book, BOOKS};
use crate::modules::orders::models::{
    CheckoutRequest, Order, OrderItem, OrderStatus, StatusChange, StatusUpdate, MAX_QUANTITY,
    ORDERS,
};
use crate::modules::promotions::models::{Promotion, PROMOTIONS};
use crate::modules::redemptions::models::{
    Redemption, RedemptionItem, RedemptionStatus, REDEMPTIONS, REDEMPTION_ITEMS,
};
use crate::modules::users::models::{User, USERS};
use crate::utils::non_empty;
use crate::utils::validation::POINTS_MAX;

/// A cart priced against current stock, promotion and balance.
#[derive(Debug, Clone, Serialize)]
pub struct PricedCart {
    pub library_id: String,
    pub items: Vec<OrderItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promotion_id: Option<String>,
    pub balance: i64,
    #[serde(flatten)]
    pub price: PriceBreakdown,
}

/// Append a ledger entry and return the balance after it.
///
/// The caller writes the returned balance back to the user.
fn post_entry(
    tx: &mut Transaction,
    user_id: &str,
    balance: i64,
    delta: i64,
    reason: LedgerReason,
    reference_id: Option<&str>,
    note: Option<&str>,
) -> Result<i64, LedgerError> {
    let balance_after = balance
        .checked_add(delta)
        .ok_or(LedgerError::AmountTooLarge { field: "delta" })?;
    if balance_after < 0 {
        return Err(LedgerError::InsufficientPoints {
            balance,
            required: -delta,
        });
    }

    let entry = LedgerEntry {
        user_id: user_id.to_string(),
        delta,
        reason,
        reference_id: reference_id.map(str::to_string),
        balance_after,
        note: note.map(str::to_string),
    };
    tx.insert_record(POINTS_LEDGER, &entry)?;
    Ok(balance_after)
}

fn set_balance(tx: &mut Transaction, user_id: &str, balance: i64) {
    tx.update(USERS, user_id, json!({ "loyalty_points": balance }));
}

/// Collapse repeated books into one line each, keeping first-seen order.
fn cart_lines(request: &CheckoutRequest) -> Result<Vec<(String, i64)>, LedgerError> {
    if request.items.is_empty() {
        return Err(LedgerError::EmptyCart);
    }

    let mut lines: Vec<(String, i64)> = Vec::with_capacity(request.items.len());
    for item in &request.items {
        let invalid = || LedgerError::InvalidQuantity {
            book_id: item.book_id.clone(),
            max: MAX_QUANTITY,
        };
        if !(1..=MAX_QUANTITY).contains(&item.quantity) {
            return Err(invalid());
        }
        match lines.iter_mut().find(|(id, _)| *id == item.book_id) {
            Some((_, quantity)) => *quantity += item.quantity,
            None => lines.push((item.book_id.clone(), item.quantity)),
        }
    }

    if let Some((book_id, _)) = lines.iter().find(|(_, q)| *q > MAX_QUANTITY) {
        return Err(LedgerError::InvalidQuantity {
            book_id: book_id.clone(),
            max: MAX_QUANTITY,
        });
    }
    Ok(lines)
}

/// Read everything the order depends on and price it. Writes nothing.
async fn price_cart(
    tx: &mut Transaction,
    buyer_id: &str,
    request: &CheckoutRequest,
    lines: &[(String, i64)],
    rules: &LoyaltySettings,
    now: DateTime<Utc>,
) -> Result<(PricedCart, Vec<i64>), LedgerError> {
    let buyer: Entity<User> = tx.require(USERS, buyer_id).await?;

    let mut library_id = non_empty(request.library_id.clone());
    let mut items = Vec::with_capacity(lines.len());
    let mut remaining = Vec::with_capacity(lines.len());

    for (book_id, quantity) in lines {
        let book: Entity<Book> = tx.require(BOOKS, book_id).await?;
        match &library_id {
            Some(library) if *library != book.library_id => return Err(LedgerError::MixedLibraries),
            Some(_) => {}
            None => library_id = Some(book.library_id.clone()),
        }
        if book.stock < *quantity {
            return Err(LedgerError::OutOfStock {
                item_id: book.id.clone(),
                title: book.title.clone(),
                available: book.stock,
                requested: *quantity,
            });
        }

        remaining.push(book.stock - quantity);
        items.push(OrderItem {
            book_id: book.id.clone(),
            title: book.title.clone(),
            quantity: *quantity,
            unit_price_cents: book.price_cents,
        });
    }
    let library_id = library_id.ok_or(LedgerError::EmptyCart)?;

    let promotion_id = non_empty(request.promotion_id.clone());
    let promotion = match &promotion_id {
        Some(id) => {
            let promotion: Entity<Promotion> = tx.require(PROMOTIONS, id).await?;
            if let Some(reason) =
                promotion.rejection(&library_id, pricing::subtotal(&items)?, now)
            {
                return Err(LedgerError::PromotionNotApplicable(reason));
            }
            Some(promotion)
        }
        None => None,
    };

    let price = pricing::price_order(
        &items,
        promotion.as_ref().map(|p| &p.discount),
        request.points_to_use,
        buyer.loyalty_points,
        rules,
    )?;

    Ok((
        PricedCart {
            library_id,
            items,
            promotion_id,
            balance: buyer.loyalty_points,
            price,
        },
        remaining,
    ))
}

/// Price a cart for the buyer without reserving anything.
pub async fn quote(
    app: &AppContext,
    buyer_id: &str,
    request: &CheckoutRequest,
) -> Result<PricedCart, LedgerError> {
    let lines = cart_lines(request)?;
    let mut tx = Transaction::new(app.store.clone());
    let (cart, _) = price_cart(
        &mut tx,
        buyer_id,
        request,
        &lines,
        &app.settings.loyalty,
        Utc::now(),
    )
    .await?;
    Ok(cart)
}

/// Place an order: take stock, spend and earn points, record it as pending.
pub async fn checkout(
    app: &AppContext,
    buyer: &Principal,
    request: CheckoutRequest,
) -> Result<Entity<Order>, LedgerError> {
    let lines = cart_lines(&request)?;
    let rules = app.settings.loyalty.clone();

    let order_id = run_transaction(&app.store, app.settings.database.transaction_attempts, |tx| {
        let buyer_id = buyer.user_id.clone();
        let request = request.clone();
        let lines = lines.clone();
        let rules = rules.clone();
        async move {
            let now = Utc::now();
            let (cart, remaining) =
                price_cart(tx, &buyer_id, &request, &lines, &rules, now).await?;

            for (item, stock) in cart.items.iter().zip(remaining) {
                tx.update(BOOKS, &item.book_id, json!({ "stock": stock }));
            }

            let order_id = new_id();
            let price = cart.price;
            let mut balance = cart.balance;
            if price.points_used > 0 {
                balance = post_entry(
                    tx,
                    &buyer_id,
                    balance,
                    -price.points_used,
                    LedgerReason::CheckoutRedemption,
                    Some(&order_id),
                    None,
                )?;
            }
            if price.points_awarded > 0 {
                balance = post_entry(
                    tx,
                    &buyer_id,
                    balance,
                    price.points_awarded,
                    LedgerReason::PurchaseAward,
                    Some(&order_id),
                    None,
                )?;
            }
            if balance != cart.balance {
                set_balance(tx, &buyer_id, balance);
            }

            let order = Order {
                user_id: buyer_id.clone(),
                library_id: cart.library_id,
                items: cart.items,
                subtotal_cents: price.subtotal_cents,
                promotion_id: cart.promotion_id,
                promotion_discount_cents: price.promotion_discount_cents,
                points_used: price.points_used,
                points_discount_cents: price.points_discount_cents,
                total_cents: price.total_cents,
                points_awarded: price.points_awarded,
                points_revoked: 0,
                status: OrderStatus::Pending,
                status_history: vec![StatusChange {
                    status: OrderStatus::Pending,
                    at: now,
                    by: buyer_id.clone(),
                    note: None,
                }],
            };
            tx.set_record(ORDERS, &order_id, &order)?;
            Ok::<_, LedgerError>(order_id)
        }
        .boxed()
    })
    .await?;

    let order = app.collection::<Order>(ORDERS).require(&order_id).await?;
    tracing::info!(
        order_id = %order.id,
        user_id = %order.user_id,
        library_id = %order.library_id,
        total_cents = order.total_cents,
        points_used = order.points_used,
        points_awarded = order.points_awarded,
        "order placed"
    );
    Ok(order)
}

/// Buyers may cancel their own pending orders; everything else is staff work.
fn authorize_order_change(
    caller: &Principal,
    order: &Order,
    next: OrderStatus,
) -> Result<(), AuthzError> {
    let buyer_cancelling = next == OrderStatus::Cancelled
        && order.status == OrderStatus::Pending
        && caller.user_id == order.user_id;
    if buyer_cancelling {
        return Ok(());
    }
    caller.ensure_library_staff(&order.library_id, "change the status of this order")
}

/// Undo the points and stock effects of an order.
async fn reverse_order(
    tx: &mut Transaction,
    order_id: &str,
    order: &mut Order,
) -> Result<(), LedgerError> {
    let buyer: Entity<User> = tx.require(USERS, &order.user_id).await?;
    let mut balance = buyer.loyalty_points;

    if order.points_used > 0 {
        balance = post_entry(
            tx,
            &order.user_id,
            balance,
            order.points_used,
            LedgerReason::OrderCancelRefund,
            Some(order_id),
            None,
        )?;
    }

    // points already spent elsewhere cannot be taken back
    let revoked = order.points_awarded.min(balance);
    if revoked > 0 {
        balance = post_entry(
            tx,
            &order.user_id,
            balance,
            -revoked,
            LedgerReason::OrderCancelRevoke,
            Some(order_id),
            None,
        )?;
    }
    order.points_revoked = revoked;

    if balance != buyer.loyalty_points {
        set_balance(tx, &order.user_id, balance);
    }

    for item in &order.items {
        match tx.get_entity::<Book>(BOOKS, &item.book_id).await? {
            Some(book) => tx.update(
                BOOKS,
                &item.book_id,
                json!({ "stock": book.stock.saturating_add(item.quantity) }),
            ),
            None => tracing::debug!(book_id = %item.book_id, "book gone, stock not restored"),
        }
    }
    Ok(())
}

pub async fn change_order_status(
    app: &AppContext,
    caller: &Principal,
    order_id: &str,
    update: StatusUpdate,
) -> Result<Entity<Order>, LedgerError> {
    run_transaction(&app.store, app.settings.database.transaction_attempts, |tx| {
        let caller = caller.clone();
        let order_id = order_id.to_string();
        let update = update.clone();
        async move {
            let mut order: Entity<Order> = tx.require(ORDERS, &order_id).await?;
            let next = update.status;
            authorize_order_change(&caller, &order, next)?;

            if !order.status.can_transition_to(next) {
                return Err(LedgerError::InvalidTransition {
                    from: order.status.to_string(),
                    to: next.to_string(),
                });
            }

            if next == OrderStatus::Cancelled {
                reverse_order(tx, &order_id, &mut order.data).await?;
            }

            order.status = next;
            order.status_history.push(StatusChange {
                status: next,
                at: Utc::now(),
                by: caller.user_id.clone(),
                note: non_empty(update.note),
            });
            tx.set_record(ORDERS, &order_id, &order.data)?;
            Ok::<_, LedgerError>(())
        }
        .boxed()
    })
    .await?;

    let order = app.collection::<Order>(ORDERS).require(order_id).await?;
    tracing::info!(
        order_id = %order.id,
        status = %order.status,
        by = %caller.user_id,
        points_revoked = order.points_revoked,
        "order status changed"
    );
    Ok(order)
}

/// Exchange points for a reward item.
pub async fn redeem(
    app: &AppContext,
    caller: &Principal,
    item_id: &str,
) -> Result<Entity<Redemption>, LedgerError> {
    let redemption_id = run_transaction(&app.store, app.settings.database.transaction_attempts, |tx| {
        let user_id = caller.user_id.clone();
        let item_id = item_id.to_string();
        async move {
            let user: Entity<User> = tx.require(USERS, &user_id).await?;
            let item: Entity<RedemptionItem> = tx.require(REDEMPTION_ITEMS, &item_id).await?;

            if !item.active {
                return Err(LedgerError::ItemUnavailable(item.name.clone()));
            }
            if item.stock <= 0 {
                return Err(LedgerError::OutOfStock {
                    item_id: item.id.clone(),
                    title: item.name.clone(),
                    available: item.stock,
                    requested: 1,
                });
            }
            if user.loyalty_points < item.points_cost {
                return Err(LedgerError::InsufficientPoints {
                    balance: user.loyalty_points,
                    required: item.points_cost,
                });
            }

            let redemption_id = new_id();
            let balance = post_entry(
                tx,
                &user_id,
                user.loyalty_points,
                -item.points_cost,
                LedgerReason::Redemption,
                Some(&redemption_id),
                None,
            )?;
            set_balance(tx, &user_id, balance);
            tx.update(REDEMPTION_ITEMS, &item_id, json!({ "stock": item.stock - 1 }));

            let redemption = Redemption {
                user_id: user_id.clone(),
                item_id: item_id.clone(),
                item_name: item.name.clone(),
                points_spent: item.points_cost,
                status: RedemptionStatus::Requested,
            };
            tx.set_record(REDEMPTIONS, &redemption_id, &redemption)?;
            Ok::<_, LedgerError>(redemption_id)
        }
        .boxed()
    })
    .await?;

    let redemption = app
        .collection::<Redemption>(REDEMPTIONS)
        .require(&redemption_id)
        .await?;
    tracing::info!(
        redemption_id = %redemption.id,
        user_id = %redemption.user_id,
        points_spent = redemption.points_spent,
        "reward redeemed"
    );
    Ok(redemption)
}

/// Admins fulfil redemptions; owners and admins may cancel them.
pub async fn change_redemption_status(
    app: &AppContext,
    caller: &Principal,
    redemption_id: &str,
    next: RedemptionStatus,
) -> Result<Entity<Redemption>, LedgerError> {
    run_transaction(&app.store, app.settings.database.transaction_attempts, |tx| {
        let caller = caller.clone();
        let redemption_id = redemption_id.to_string();
        async move {
            let mut redemption: Entity<Redemption> = tx.require(REDEMPTIONS, &redemption_id).await?;
            match next {
                RedemptionStatus::Cancelled => {
                    caller.ensure_self(&redemption.user_id, "cancel this redemption")?
                }
                _ => caller.require_admin("fulfil redemptions")?,
            }

            if !redemption.status.can_transition_to(next) {
                return Err(LedgerError::InvalidTransition {
                    from: redemption.status.as_str().to_string(),
                    to: next.as_str().to_string(),
                });
            }

            if next == RedemptionStatus::Cancelled {
                let user: Entity<User> = tx.require(USERS, &redemption.user_id).await?;
                let balance = post_entry(
                    tx,
                    &redemption.user_id,
                    user.loyalty_points,
                    redemption.points_spent,
                    LedgerReason::RedemptionRefund,
                    Some(&redemption_id),
                    None,
                )?;
                set_balance(tx, &redemption.user_id, balance);

                if let Some(item) = tx
                    .get_entity::<RedemptionItem>(REDEMPTION_ITEMS, &redemption.item_id)
                    .await?
                {
                    tx.update(
                        REDEMPTION_ITEMS,
                        &redemption.item_id,
                        json!({ "stock": item.stock.saturating_add(1) }),
                    );
                }
            }

            redemption.status = next;
            tx.set_record(REDEMPTIONS, &redemption_id, &redemption.data)?;
            Ok::<_, LedgerError>(())
        }
        .boxed()
    })
    .await?;

    let redemption = app
        .collection::<Redemption>(REDEMPTIONS)
        .require(redemption_id)
        .await?;
    tracing::info!(
        redemption_id = %redemption.id,
        status = redemption.status.as_str(),
        by = %caller.user_id,
        "redemption status changed"
    );
    Ok(redemption)
}

/// Admin correction of a balance. Returns the new balance.
pub async fn adjust(
    app: &AppContext,
    admin: &Principal,
    user_id: &str,
    request: AdjustRequest,
) -> Result<i64, LedgerError> {
    admin.require_admin("adjust loyalty points")?;
    let note = request.note.trim().to_string();
    let out_of_range = request.delta.unsigned_abs() > POINTS_MAX.unsigned_abs();
    if request.delta == 0 || out_of_range || note.is_empty() {
        return Err(LedgerError::InvalidAdjustment);
    }

    let balance = run_transaction(&app.store, app.settings.database.transaction_attempts, |tx| {
        let user_id = user_id.to_string();
        let note = note.clone();
        let delta = request.delta;
        async move {
            let user: Entity<User> = tx.require(USERS, &user_id).await?;
            if user.loyalty_points.checked_add(delta).is_some_and(|after| after < 0) {
                return Err(LedgerError::NegativeBalance {
                    balance: user.loyalty_points,
                    delta,
                });
            }
            let balance = post_entry(
                tx,
                &user_id,
                user.loyalty_points,
                delta,
                LedgerReason::Adjustment,
                None,
                Some(&note),
            )?;
            set_balance(tx, &user_id, balance);
            Ok::<_, LedgerError>(balance)
        }
        .boxed()
    })
    .await?;

    tracing::info!(%user_id, delta = request.delta, balance, by = %admin.user_id, "points adjusted");
    Ok(balance)
}

/// Newest entries first.
pub async fn history(
    app: &AppContext,
    user_id: &str,
    limit: usize,
) -> Result<Vec<Entity<LedgerEntry>>, StoreError> {
    let mut entries = app
        .collection::<LedgerEntry>(POINTS_LEDGER)
        .list(&Query::new().eq("user_id", user_id))
        .await?;
    entries.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
    entries.truncate(limit);
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::orders::models::CartItem;
    use crate::modules::promotions::models::Discount;
    use crate::test_support::{seed, test_app};
    use alicia_authz::Role;
    use chrono::Duration;

    fn cart(items: &[(&str, i64)], points: i64) -> CheckoutRequest {
        CheckoutRequest {
            library_id: None,
            items: items
                .iter()
                .map(|(id, quantity)| CartItem {
                    book_id: id.to_string(),
                    quantity: *quantity,
                })
                .collect(),
            promotion_id: None,
            points_to_use: points,
        }
    }

    fn reader(id: &str) -> Principal {
        Principal {
            user_id: id.into(),
            role: Role::Reader,
            library_id: None,
            author_id: None,
        }
    }

    fn staff(library_id: &str) -> Principal {
        Principal {
            user_id: "staff-1".into(),
            role: Role::Library,
            library_id: Some(library_id.into()),
            author_id: None,
        }
    }

    async fn balance(app: &AppContext, user_id: &str) -> i64 {
        app.collection::<User>(USERS)
            .require(user_id)
            .await
            .unwrap()
            .loyalty_points
    }

    async fn stock(app: &AppContext, book_id: &str) -> i64 {
        app.collection::<Book>(BOOKS).require(book_id).await.unwrap().stock
    }

    async fn ledger_len(app: &AppContext, user_id: &str) -> usize {
        history(app, user_id, usize::MAX).await.unwrap().len()
    }

    #[test]
    fn test_cart_lines_merge_duplicates() {
        let lines = cart_lines(&cart(&[("a", 1), ("b", 2), ("a", 3)], 0)).unwrap();
        assert_eq!(lines, vec![("a".to_string(), 4), ("b".to_string(), 2)]);

        assert!(matches!(cart_lines(&cart(&[], 0)), Err(LedgerError::EmptyCart)));
        assert!(matches!(
            cart_lines(&cart(&[("a", 0)], 0)),
            Err(LedgerError::InvalidQuantity { .. })
        ));
        assert!(matches!(
            cart_lines(&cart(&[("a", 60), ("a", 60)], 0)),
            Err(LedgerError::InvalidQuantity { .. })
        ));
        assert!(matches!(
            cart_lines(&cart(&[("a", i64::MAX), ("a", i64::MAX)], 0)),
            Err(LedgerError::InvalidQuantity { .. })
        ));
    }

    #[tokio::test]
    async fn test_checkout_moves_stock_and_points() {
        let (app, _dir) = test_app();
        seed::user(&app, "u1", Role::Reader, 200).await;
        seed::book(&app, "b1", "lib-1", 1_500, 5).await;
        seed::book(&app, "b2", "lib-1", 2_000, 1).await;

        let order = checkout(&app, &reader("u1"), cart(&[("b1", 2), ("b2", 1)], 100))
            .await
            .unwrap();

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.subtotal_cents, 5_000);
        assert_eq!(order.points_discount_cents, 500);
        assert_eq!(order.total_cents, 4_500);
        assert_eq!(order.points_awarded, 45);
        assert_eq!(balance(&app, "u1").await, 200 - 100 + 45);
        assert_eq!(stock(&app, "b1").await, 3);
        assert_eq!(stock(&app, "b2").await, 0);

        let entries = history(&app, "u1", 10).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert!(entries.iter().all(|e| e.reference_id.as_deref() == Some(order.id.as_str())));
        assert!(entries
            .iter()
            .any(|e| e.reason == LedgerReason::PurchaseAward && e.balance_after == 145));
    }

    #[tokio::test]
    async fn test_checkout_applies_promotion() {
        let (app, _dir) = test_app();
        seed::user(&app, "u1", Role::Reader, 0).await;
        seed::book(&app, "b1", "lib-1", 2_500, 2).await;
        seed::promotion(&app, "p1", "lib-1", Discount::PercentOff { percent: 20 }).await;

        let mut request = cart(&[("b1", 2)], 0);
        request.promotion_id = Some("p1".into());
        let order = checkout(&app, &reader("u1"), request).await.unwrap();

        assert_eq!(order.promotion_discount_cents, 1_000);
        assert_eq!(order.total_cents, 4_000);
        assert_eq!(order.points_awarded, 40);
    }

    #[tokio::test]
    async fn test_failed_checkout_changes_nothing() {
        let (app, _dir) = test_app();
        seed::user(&app, "u1", Role::Reader, 10).await;
        seed::book(&app, "b1", "lib-1", 1_000, 4).await;
        seed::book(&app, "b2", "lib-1", 1_000, 1).await;
        seed::book(&app, "b3", "lib-2", 1_000, 9).await;

        let err = checkout(&app, &reader("u1"), cart(&[("b1", 1), ("b2", 2)], 0))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::OutOfStock { requested: 2, available: 1, .. }));

        let err = checkout(&app, &reader("u1"), cart(&[("b1", 1)], 50))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientPoints { .. }));

        let err = checkout(&app, &reader("u1"), cart(&[("b1", 1), ("b3", 1)], 0))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::MixedLibraries));

        assert_eq!(stock(&app, "b1").await, 4);
        assert_eq!(stock(&app, "b2").await, 1);
        assert_eq!(balance(&app, "u1").await, 10);
        assert_eq!(ledger_len(&app, "u1").await, 0);
        assert!(app
            .collection::<Order>(ORDERS)
            .list(&Query::new())
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_promotion_of_other_library_rejected() {
        let (app, _dir) = test_app();
        seed::user(&app, "u1", Role::Reader, 0).await;
        seed::book(&app, "b1", "lib-1", 3_000, 1).await;
        seed::promotion(&app, "p2", "lib-2", Discount::AmountOff { amount_cents: 500 }).await;

        let mut request = cart(&[("b1", 1)], 0);
        request.promotion_id = Some("p2".into());
        let err = checkout(&app, &reader("u1"), request).await.unwrap_err();
        assert!(matches!(err, LedgerError::PromotionNotApplicable(_)));
        assert_eq!(stock(&app, "b1").await, 1);
    }

    #[tokio::test]
    async fn test_cancel_refunds_and_revokes() {
        let (app, _dir) = test_app();
        seed::user(&app, "u1", Role::Reader, 100).await;
        seed::book(&app, "b1", "lib-1", 2_000, 3).await;

        let order = checkout(&app, &reader("u1"), cart(&[("b1", 2)], 100))
            .await
            .unwrap();
        // 4000 - 500 = 3500 cents paid, 35 points earned
        assert_eq!(balance(&app, "u1").await, 35);

        let cancelled = change_order_status(
            &app,
            &reader("u1"),
            &order.id,
            StatusUpdate {
                status: OrderStatus::Cancelled,
                note: Some("cambié de idea".into()),
            },
        )
        .await
        .unwrap();

        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(cancelled.points_revoked, 35);
        assert_eq!(cancelled.status_history.len(), 2);
        assert_eq!(balance(&app, "u1").await, 100);
        assert_eq!(stock(&app, "b1").await, 3);
        assert_eq!(ledger_len(&app, "u1").await, 4);
    }

    #[tokio::test]
    async fn test_revoke_saturates_at_balance() {
        let (app, _dir) = test_app();
        seed::user(&app, "u1", Role::Reader, 0).await;
        seed::book(&app, "b1", "lib-1", 5_000, 1).await;
        seed::item(&app, "i1", 30, 5, true).await;

        let order = checkout(&app, &reader("u1"), cart(&[("b1", 1)], 0))
            .await
            .unwrap();
        assert_eq!(order.points_awarded, 50);
        redeem(&app, &reader("u1"), "i1").await.unwrap();
        assert_eq!(balance(&app, "u1").await, 20);

        let cancelled = change_order_status(
            &app,
            &staff("lib-1"),
            &order.id,
            StatusUpdate {
                status: OrderStatus::Cancelled,
                note: None,
            },
        )
        .await
        .unwrap();

        assert_eq!(cancelled.points_revoked, 20);
        assert_eq!(balance(&app, "u1").await, 0);
    }

    #[tokio::test]
    async fn test_cancel_skips_deleted_books() {
        let (app, _dir) = test_app();
        seed::user(&app, "u1", Role::Reader, 0).await;
        seed::book(&app, "b1", "lib-1", 1_000, 2).await;

        let order = checkout(&app, &reader("u1"), cart(&[("b1", 1)], 0))
            .await
            .unwrap();
        app.collection::<Book>(BOOKS).delete("b1").await.unwrap();

        let cancelled = change_order_status(
            &app,
            &reader("u1"),
            &order.id,
            StatusUpdate {
                status: OrderStatus::Cancelled,
                note: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert!(app.collection::<Book>(BOOKS).get("b1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_status_transitions_and_permissions() {
        let (app, _dir) = test_app();
        seed::user(&app, "u1", Role::Reader, 0).await;
        seed::book(&app, "b1", "lib-1", 1_000, 2).await;
        let order = checkout(&app, &reader("u1"), cart(&[("b1", 1)], 0))
            .await
            .unwrap();
        let update = |status| StatusUpdate { status, note: None };

        let err = change_order_status(&app, &reader("u1"), &order.id, update(OrderStatus::Confirmed))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Authz(_)));

        let err = change_order_status(&app, &staff("lib-2"), &order.id, update(OrderStatus::Confirmed))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::Authz(_)));

        let err = change_order_status(&app, &staff("lib-1"), &order.id, update(OrderStatus::Shipped))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidTransition { .. }));

        for status in [OrderStatus::Confirmed, OrderStatus::Shipped, OrderStatus::Delivered] {
            change_order_status(&app, &staff("lib-1"), &order.id, update(status))
                .await
                .unwrap();
        }

        let err = change_order_status(&app, &staff("lib-1"), &order.id, update(OrderStatus::Cancelled))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidTransition { .. }));
        assert_eq!(stock(&app, "b1").await, 1);
    }

    #[tokio::test]
    async fn test_redeem_and_cancel() {
        let (app, _dir) = test_app();
        seed::user(&app, "u1", Role::Reader, 120).await;
        seed::item(&app, "i1", 100, 1, true).await;

        let redemption = redeem(&app, &reader("u1"), "i1").await.unwrap();
        assert_eq!(redemption.status, RedemptionStatus::Requested);
        assert_eq!(balance(&app, "u1").await, 20);

        let err = redeem(&app, &reader("u1"), "i1").await.unwrap_err();
        assert!(matches!(err, LedgerError::OutOfStock { .. }));

        let cancelled =
            change_redemption_status(&app, &reader("u1"), &redemption.id, RedemptionStatus::Cancelled)
                .await
                .unwrap();
        assert_eq!(cancelled.status, RedemptionStatus::Cancelled);
        assert_eq!(balance(&app, "u1").await, 120);
        let item = app
            .collection::<RedemptionItem>(REDEMPTION_ITEMS)
            .require("i1")
            .await
            .unwrap();
        assert_eq!(item.stock, 1);

        let err =
            change_redemption_status(&app, &reader("u1"), &redemption.id, RedemptionStatus::Cancelled)
                .await
                .unwrap_err();
        assert!(matches!(err, LedgerError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_redeem_rejections_change_nothing() {
        let (app, _dir) = test_app();
        seed::user(&app, "u1", Role::Reader, 50).await;
        seed::item(&app, "pricey", 80, 3, true).await;
        seed::item(&app, "retired", 10, 3, false).await;

        assert!(matches!(
            redeem(&app, &reader("u1"), "pricey").await.unwrap_err(),
            LedgerError::InsufficientPoints { balance: 50, required: 80 }
        ));
        assert!(matches!(
            redeem(&app, &reader("u1"), "retired").await.unwrap_err(),
            LedgerError::ItemUnavailable(_)
        ));
        assert_eq!(balance(&app, "u1").await, 50);
        assert_eq!(ledger_len(&app, "u1").await, 0);
    }

    #[tokio::test]
    async fn test_only_admin_fulfils() {
        let (app, _dir) = test_app();
        seed::user(&app, "u1", Role::Reader, 10).await;
        seed::item(&app, "i1", 10, 1, true).await;
        let redemption = redeem(&app, &reader("u1"), "i1").await.unwrap();

        let err =
            change_redemption_status(&app, &reader("u1"), &redemption.id, RedemptionStatus::Fulfilled)
                .await
                .unwrap_err();
        assert!(matches!(err, LedgerError::Authz(_)));

        let admin = Principal {
            role: Role::Admin,
            ..reader("admin-1")
        };
        let fulfilled =
            change_redemption_status(&app, &admin, &redemption.id, RedemptionStatus::Fulfilled)
                .await
                .unwrap();
        assert_eq!(fulfilled.status, RedemptionStatus::Fulfilled);
        assert_eq!(balance(&app, "u1").await, 0);
    }

    #[tokio::test]
    async fn test_adjust_never_negative() {
        let (app, _dir) = test_app();
        seed::user(&app, "u1", Role::Reader, 30).await;
        let admin = Principal {
            role: Role::Admin,
            ..reader("admin-1")
        };
        let request = |delta: i64| AdjustRequest {
            delta,
            note: "compensación".into(),
        };

        assert_eq!(adjust(&app, &admin, "u1", request(-10)).await.unwrap(), 20);
        assert!(matches!(
            adjust(&app, &admin, "u1", request(-21)).await.unwrap_err(),
            LedgerError::NegativeBalance { balance: 20, delta: -21 }
        ));
        assert!(matches!(
            adjust(&app, &reader("u1"), "u1", request(5)).await.unwrap_err(),
            LedgerError::Authz(_)
        ));
        assert!(matches!(
            adjust(&app, &admin, "u1", AdjustRequest { delta: 5, note: "  ".into() })
                .await
                .unwrap_err(),
            LedgerError::InvalidAdjustment
        ));

        let entries = history(&app, "u1", 10).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].note.as_deref(), Some("compensación"));
    }

    #[tokio::test]
    async fn test_adjust_rejects_out_of_range_deltas() {
        let (app, _dir) = test_app();
        seed::user(&app, "u1", Role::Reader, 30).await;
        let admin = Principal {
            role: Role::Admin,
            ..reader("admin-1")
        };
        let request = |delta: i64| AdjustRequest {
            delta,
            note: "corrección".into(),
        };

        for delta in [i64::MAX, i64::MIN, POINTS_MAX + 1] {
            assert!(matches!(
                adjust(&app, &admin, "u1", request(delta)).await.unwrap_err(),
                LedgerError::InvalidAdjustment
            ));
        }
        assert_eq!(adjust(&app, &admin, "u1", request(POINTS_MAX)).await.unwrap(), POINTS_MAX + 30);
        assert_eq!(balance(&app, "u1").await, POINTS_MAX + 30);
        assert_eq!(ledger_len(&app, "u1").await, 1);
    }

    #[tokio::test]
    async fn test_checkout_rejects_overflowing_prices() {
        let (app, _dir) = test_app();
        seed::user(&app, "u1", Role::Reader, 0).await;
        seed::book(&app, "b1", "lib-1", 100_000_000_000_000_000, 200).await;

        let err = checkout(&app, &reader("u1"), cart(&[("b1", 100)], 0))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::AmountTooLarge { field: "items" }));
        assert!(matches!(
            quote(&app, "u1", &cart(&[("b1", 100)], 0)).await,
            Err(LedgerError::AmountTooLarge { .. })
        ));
        assert_eq!(stock(&app, "b1").await, 200);
        assert_eq!(ledger_len(&app, "u1").await, 0);
    }

    #[tokio::test]
    async fn test_quote_reserves_nothing() {
        let (app, _dir) = test_app();
        seed::user(&app, "u1", Role::Reader, 40).await;
        seed::book(&app, "b1", "lib-1", 1_200, 1).await;
        let mut request = cart(&[("b1", 1)], 40);
        request.library_id = Some("lib-1".into());

        let quoted = quote(&app, "u1", &request).await.unwrap();
        assert_eq!(quoted.price.total_cents, 1_000);
        assert_eq!(quoted.balance, 40);
        assert_eq!(stock(&app, "b1").await, 1);
        assert_eq!(balance(&app, "u1").await, 40);
    }

    #[tokio::test]
    async fn test_expired_promotion_rejected() {
        let (app, _dir) = test_app();
        seed::user(&app, "u1", Role::Reader, 0).await;
        seed::book(&app, "b1", "lib-1", 1_000, 1).await;
        let now = Utc::now();
        let expired = Promotion {
            library_id: "lib-1".into(),
            title: "Verano".into(),
            description: String::new(),
            discount: Discount::PercentOff { percent: 15 },
            min_subtotal_cents: 0,
            starts_at: now - Duration::days(30),
            ends_at: now - Duration::days(1),
            active: true,
        };
        app.collection::<Promotion>(PROMOTIONS).put("old", &expired).await.unwrap();

        let mut request = cart(&[("b1", 1)], 0);
        request.promotion_id = Some("old".into());
        assert!(matches!(
            quote(&app, "u1", &request).await.unwrap_err(),
            LedgerError::PromotionNotApplicable(_)
        ));
    }
}
