//! Invoice lifecycle through the engine, against an in-memory database.

mod common;

use std::sync::Arc;

use agrimart_billing::{
    BillingEngine, BillingError, BillingWarning, CreateInvoiceCommand, ErrorCode, InvoiceLineCommand,
    RecordPaymentCommand, StatusContext, UpdateInvoiceCommand,
};
use agrimart_core::{InvoiceStatus, Money, PaymentMethod, Percent, MAX_INVOICE_ADJUSTMENT};
use chrono::{NaiveDate, TimeZone, Utc};
use rust_decimal_macros::dec;

use common::*;

fn pay(invoice_id: &str, amount: i64) -> RecordPaymentCommand {
    RecordPaymentCommand::new(invoice_id, Money::from_major(amount), PaymentMethod::Cash)
}

// =============================================================================
// Creation
// =============================================================================

#[tokio::test]
async fn test_last_units_then_insufficient_stock() {
    let (engine, _) = memory_engine().await;
    let db = engine.db().clone();
    let product = add_product(&db, "FERT-UREA", Money::from_major(100), 0, 5).await;
    let customer = add_customer(&db, "Ramesh Patil").await;

    let first = engine
        .create_invoice(CreateInvoiceCommand::new(
            &customer.id,
            vec![InvoiceLineCommand::new(&product.id, 5)],
        ))
        .await
        .unwrap();
    assert_eq!(first.value.status, InvoiceStatus::Unpaid);
    assert_eq!(stock_of(&db, &product.id).await, 0);

    let err = engine
        .create_invoice(CreateInvoiceCommand::new(
            &customer.id,
            vec![InvoiceLineCommand::new(&product.id, 1)],
        ))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BillingError::InsufficientStock {
            available: 0,
            requested: 1,
            ..
        }
    ));
}

#[tokio::test]
async fn test_total_rounds_to_whole_units() {
    let (engine, _) = memory_engine().await;
    let db = engine.db().clone();
    let product = add_product(&db, "SEED-WHT", Money::from_major(1900), 0, 10).await;
    let customer = add_customer(&db, "Sunita Devi").await;

    let invoice = engine
        .create_invoice(CreateInvoiceCommand::new(
            &customer.id,
            vec![InvoiceLineCommand::new(&product.id, 1)
                .with_unit_price(Money::from(dec!(999.995)))],
        ))
        .await
        .unwrap()
        .into_value();

    assert_eq!(invoice.total, Money::from_major(1000));
    assert_eq!(invoice.round_off, Money::from(dec!(0.005)));
    assert_eq!(invoice.balance, Money::from_major(1000));

    let stored = engine.get_invoice(&invoice.id).await.unwrap();
    assert_eq!(stored.round_off, Money::from(dec!(0.005)));
    assert_eq!(
        customer_of(&db, &customer.id).await.outstanding_balance,
        Money::from_major(1000)
    );
}

#[tokio::test]
async fn test_create_prices_from_catalog_and_charges_ledger() {
    let (engine, _) = memory_engine().await;
    let db = engine.db().clone();
    let product = add_product(&db, "FERT-UREA", Money::from_major(267), 5, 20).await;
    let customer = add_customer(&db, "Gurpreet Singh").await;

    let created = engine
        .create_invoice(CreateInvoiceCommand::new(
            &customer.id,
            vec![InvoiceLineCommand::new(&product.id, 5)],
        ))
        .await
        .unwrap();
    assert!(!created.has_warnings());
    let invoice = created.value;

    // 5 × 267 = 1335, tax 66.75, raw 1401.75
    assert_eq!(invoice.invoice_number, "INV-202403-0001");
    assert_eq!(invoice.subtotal, Money::from_major(1335));
    assert_eq!(invoice.tax_amount, Money::from(dec!(66.75)));
    assert_eq!(invoice.total, Money::from_major(1402));
    assert_eq!(invoice.round_off, Money::from(dec!(0.25)));
    assert_eq!(invoice.items[0].product_name, product.name);
    assert_eq!(invoice.items[0].tax_rate, Percent::from_whole(5).unwrap());
    assert_eq!(invoice.due_date, NaiveDate::from_ymd_opt(2024, 4, 4).unwrap());

    let account = customer_of(&db, &customer.id).await;
    assert_eq!(account.outstanding_balance, Money::from_major(1402));
    assert_eq!(account.total_purchases, Money::from_major(1402));
    assert_eq!(account.last_purchase_at, Some(march_5()));
    assert_eq!(stock_of(&db, &product.id).await, 15);
}

#[tokio::test]
async fn test_duplicate_lines_are_summed_before_the_stock_check() {
    let (engine, _) = memory_engine().await;
    let db = engine.db().clone();
    let product = add_product(&db, "PEST-MANC", Money::from_major(460), 18, 4).await;
    let customer = add_customer(&db, "Lakshmi Narayanan").await;

    let err = engine
        .create_invoice(CreateInvoiceCommand::new(
            &customer.id,
            vec![
                InvoiceLineCommand::new(&product.id, 2),
                InvoiceLineCommand::new(&product.id, 3),
            ],
        ))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        BillingError::InsufficientStock {
            available: 4,
            requested: 5,
            ..
        }
    ));

    // Nothing survived the failed attempt, including its number
    assert_eq!(stock_of(&db, &product.id).await, 4);
    assert_eq!(db.invoices().count().await.unwrap(), 0);

    let invoice = engine
        .create_invoice(CreateInvoiceCommand::new(
            &customer.id,
            vec![InvoiceLineCommand::new(&product.id, 4)],
        ))
        .await
        .unwrap()
        .into_value();
    assert_eq!(invoice.invoice_number, "INV-202403-0001");
}

#[tokio::test]
async fn test_numbers_increase_and_restart_each_month() {
    let (engine, clock) = memory_engine().await;
    let db = engine.db().clone();
    let product = add_product(&db, "FEED-CATL", Money::from_major(1450), 0, 50).await;
    let customer = add_customer(&db, "Krishi Seva Kendra").await;
    let command =
        || CreateInvoiceCommand::new(&customer.id, vec![InvoiceLineCommand::new(&product.id, 1)]);

    let first = engine.create_invoice(command()).await.unwrap().into_value();
    let second = engine.create_invoice(command()).await.unwrap().into_value();
    clock.set(Utc.with_ymd_and_hms(2024, 4, 1, 0, 5, 0).unwrap());
    let april = engine.create_invoice(command()).await.unwrap().into_value();

    assert_eq!(first.invoice_number, "INV-202403-0001");
    assert_eq!(second.invoice_number, "INV-202403-0002");
    assert_eq!(april.invoice_number, "INV-202404-0001");
}

#[tokio::test]
async fn test_create_rejections() {
    let (engine, _) = memory_engine().await;
    let db = engine.db().clone();
    let product = add_product(&db, "TOOL-SPADE", Money::from_major(380), 12, 10).await;
    let retired = add_product(&db, "TOOL-OLD", Money::from_major(90), 12, 10).await;
    db.products().deactivate(&retired.id).await.unwrap();
    let customer = add_customer(&db, "Ramesh Patil").await;

    // Unknown customer
    let stranger = uuid_like();
    let err = engine
        .create_invoice(CreateInvoiceCommand::new(
            &stranger,
            vec![InvoiceLineCommand::new(&product.id, 1)],
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, BillingError::NotFound { .. }));

    // Inactive product
    let err = engine
        .create_invoice(CreateInvoiceCommand::new(
            &customer.id,
            vec![InvoiceLineCommand::new(&retired.id, 1)],
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, BillingError::Validation(_)));

    // No lines
    let err = engine
        .create_invoice(CreateInvoiceCommand::new(&customer.id, vec![]))
        .await
        .unwrap_err();
    assert!(matches!(err, BillingError::Validation(_)));

    // Zero quantity
    let err = engine
        .create_invoice(CreateInvoiceCommand::new(
            &customer.id,
            vec![InvoiceLineCommand::new(&product.id, 0)],
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, BillingError::Validation(_)));

    // Discount larger than the goods
    let err = engine
        .create_invoice(
            CreateInvoiceCommand::new(&customer.id, vec![InvoiceLineCommand::new(&product.id, 1)])
                .with_discount(Money::from_major(1000)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, BillingError::Validation(_)));

    // Price large enough to overflow the line arithmetic
    let err = engine
        .create_invoice(CreateInvoiceCommand::new(
            &customer.id,
            vec![InvoiceLineCommand::new(&product.id, 100_000)
                .with_unit_price(Money::new(dec!(10000000000000000000000000)))],
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, BillingError::Validation(_)));

    // Shipping above the adjustment ceiling
    let err = engine
        .create_invoice(
            CreateInvoiceCommand::new(&customer.id, vec![InvoiceLineCommand::new(&product.id, 1)])
                .with_shipping(Money::from_major(MAX_INVOICE_ADJUSTMENT + 1)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, BillingError::Validation(_)));

    assert_eq!(stock_of(&db, &product.id).await, 10);
    assert_eq!(customer_of(&db, &customer.id).await.outstanding_balance, Money::ZERO);
}

#[tokio::test]
async fn test_zero_total_invoice_is_created_paid() {
    let (engine, _) = memory_engine().await;
    let db = engine.db().clone();
    let sample = add_product(&db, "SEED-SAMPLE", Money::ZERO, 0, 10).await;
    let customer = add_customer(&db, "Sunita Devi").await;

    let invoice = engine
        .create_invoice(CreateInvoiceCommand::new(
            &customer.id,
            vec![InvoiceLineCommand::new(&sample.id, 2)],
        ))
        .await
        .unwrap()
        .into_value();

    assert_eq!(invoice.status, InvoiceStatus::Paid);
    assert_eq!(invoice.balance, Money::ZERO);
    assert_eq!(stock_of(&db, &sample.id).await, 8);
}

// =============================================================================
// Payments
// =============================================================================

#[tokio::test]
async fn test_partial_then_full_payment() {
    let (engine, _) = memory_engine().await;
    let db = engine.db().clone();
    let product = add_product(&db, "FERT-DAP", Money::from_major(1000), 0, 10).await;
    let customer = add_customer(&db, "Gurpreet Singh").await;
    let invoice = engine
        .create_invoice(CreateInvoiceCommand::new(
            &customer.id,
            vec![InvoiceLineCommand::new(&product.id, 1)],
        ))
        .await
        .unwrap()
        .into_value();

    let after_first = engine
        .record_payment(pay(&invoice.id, 400).with_reference("UPI-8812"))
        .await
        .unwrap()
        .into_value();
    assert_eq!(after_first.status, InvoiceStatus::PartiallyPaid);
    assert_eq!(after_first.balance, Money::from_major(600));
    assert_eq!(
        customer_of(&db, &customer.id).await.outstanding_balance,
        Money::from_major(600)
    );

    let after_second = engine
        .record_payment(pay(&invoice.id, 600))
        .await
        .unwrap()
        .into_value();
    assert_eq!(after_second.status, InvoiceStatus::Paid);
    assert_eq!(after_second.balance, Money::ZERO);
    assert_eq!(customer_of(&db, &customer.id).await.outstanding_balance, Money::ZERO);

    let stored = engine.get_invoice(&invoice.id).await.unwrap();
    assert_eq!(stored.payments.len(), 2);
    assert_eq!(stored.amount_paid, Money::from_major(1000));
    assert_eq!(stored.payments[0].reference.as_deref(), Some("UPI-8812"));

    // Paid invoices take no more money
    let err = engine.record_payment(pay(&invoice.id, 1)).await.unwrap_err();
    assert!(matches!(err, BillingError::InvalidTransition { .. }));
}

#[tokio::test]
async fn test_bad_payment_amounts_change_nothing() {
    let (engine, _) = memory_engine().await;
    let db = engine.db().clone();
    let product = add_product(&db, "FERT-MOP", Money::from_major(500), 0, 10).await;
    let customer = add_customer(&db, "Ramesh Patil").await;
    let invoice = engine
        .create_invoice(CreateInvoiceCommand::new(
            &customer.id,
            vec![InvoiceLineCommand::new(&product.id, 1)],
        ))
        .await
        .unwrap()
        .into_value();

    let over = engine.record_payment(pay(&invoice.id, 501)).await.unwrap_err();
    match &over {
        BillingError::PaymentExceedsBalance { amount, balance } => {
            assert_eq!(*amount, Money::from_major(501));
            assert_eq!(*balance, Money::from_major(500));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(over.code(), ErrorCode::InvalidTransition);
    assert!(!over.is_retryable());

    let zero = engine.record_payment(pay(&invoice.id, 0)).await.unwrap_err();
    assert!(matches!(zero, BillingError::Validation(_)));

    let stored = engine.get_invoice(&invoice.id).await.unwrap();
    assert_eq!(stored.status, InvoiceStatus::Unpaid);
    assert!(stored.payments.is_empty());
    assert_eq!(stored.version, invoice.version);
    assert_eq!(
        customer_of(&db, &customer.id).await.outstanding_balance,
        Money::from_major(500)
    );
}

// =============================================================================
// Drafts and status changes
// =============================================================================

#[tokio::test]
async fn test_draft_is_charged_only_when_issued() {
    let (engine, _) = memory_engine().await;
    let db = engine.db().clone();
    let product = add_product(&db, "SEED-MUS", Money::from_major(480), 0, 10).await;
    let customer = add_customer(&db, "Lakshmi Narayanan").await;

    let draft = engine
        .create_invoice(
            CreateInvoiceCommand::new(&customer.id, vec![InvoiceLineCommand::new(&product.id, 2)])
                .as_draft(),
        )
        .await
        .unwrap()
        .into_value();
    assert_eq!(draft.status, InvoiceStatus::Draft);
    assert_eq!(stock_of(&db, &product.id).await, 8);
    assert_eq!(customer_of(&db, &customer.id).await.outstanding_balance, Money::ZERO);

    let err = engine.record_payment(pay(&draft.id, 100)).await.unwrap_err();
    assert!(matches!(err, BillingError::InvalidTransition { .. }));

    let issued = engine
        .set_status(&draft.id, InvoiceStatus::Unpaid, StatusContext::default())
        .await
        .unwrap()
        .into_value();
    assert_eq!(issued.status, InvoiceStatus::Unpaid);
    assert!(issued.issued_at.is_some());

    let account = customer_of(&db, &customer.id).await;
    assert_eq!(account.outstanding_balance, Money::from_major(960));
    assert_eq!(account.total_purchases, Money::from_major(960));

    // Issuing twice is not a thing
    let err = engine
        .set_status(&draft.id, InvoiceStatus::Unpaid, StatusContext::default())
        .await
        .unwrap_err();
    assert!(matches!(err, BillingError::InvalidTransition { .. }));
}

#[tokio::test]
async fn test_mark_paid_settles_remaining_balance() {
    let (engine, _) = memory_engine().await;
    let db = engine.db().clone();
    let product = add_product(&db, "FEED-POUL", Money::from_major(980), 0, 10).await;
    let customer = add_customer(&db, "Sunita Devi").await;
    let invoice = engine
        .create_invoice(
            CreateInvoiceCommand::new(&customer.id, vec![InvoiceLineCommand::new(&product.id, 1)])
                .as_draft(),
        )
        .await
        .unwrap()
        .into_value();

    let context = StatusContext {
        method: PaymentMethod::Upi,
        reference: Some("UPI-4410".to_string()),
        recorded_by: Some("counter-1".to_string()),
    };
    let paid = engine
        .set_status(&invoice.id, InvoiceStatus::Paid, context)
        .await
        .unwrap()
        .into_value();

    assert_eq!(paid.status, InvoiceStatus::Paid);
    assert_eq!(paid.amount_paid, Money::from_major(980));
    assert_eq!(paid.balance, Money::ZERO);

    let stored = engine.get_invoice(&invoice.id).await.unwrap();
    assert_eq!(stored.payments.len(), 1);
    assert_eq!(stored.payments[0].method, PaymentMethod::Upi);

    let account = customer_of(&db, &customer.id).await;
    assert_eq!(account.outstanding_balance, Money::ZERO);
    assert_eq!(account.total_purchases, Money::from_major(980));

    // Marking a paid invoice paid again changes nothing
    let again = engine
        .set_status(&invoice.id, InvoiceStatus::Paid, StatusContext::default())
        .await
        .unwrap()
        .into_value();
    assert_eq!(again.version, stored.version);
}

#[tokio::test]
async fn test_side_effect_statuses_cannot_be_set() {
    let (engine, _) = memory_engine().await;
    let db = engine.db().clone();
    let product = add_product(&db, "FERT-SSP", Money::from_major(450), 5, 10).await;
    let customer = add_customer(&db, "Ramesh Patil").await;
    let invoice = engine
        .create_invoice(CreateInvoiceCommand::new(
            &customer.id,
            vec![InvoiceLineCommand::new(&product.id, 1)],
        ))
        .await
        .unwrap()
        .into_value();

    for target in [InvoiceStatus::PartiallyPaid, InvoiceStatus::Draft] {
        let err = engine
            .set_status(&invoice.id, target, StatusContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, BillingError::InvalidTransition { .. }));
    }
}

// =============================================================================
// Cancel and delete
// =============================================================================

#[tokio::test]
async fn test_cancel_returns_stock_and_reverses_balance() {
    let (engine, _) = memory_engine().await;
    let db = engine.db().clone();
    let product = add_product(&db, "PEST-CHLOR", Money::from_major(200), 5, 10).await;
    let customer = add_customer(&db, "Gurpreet Singh").await;
    let invoice = engine
        .create_invoice(CreateInvoiceCommand::new(
            &customer.id,
            vec![InvoiceLineCommand::new(&product.id, 3)],
        ))
        .await
        .unwrap()
        .into_value();
    assert_eq!(stock_of(&db, &product.id).await, 7);
    assert_eq!(
        customer_of(&db, &customer.id).await.outstanding_balance,
        Money::from_major(630)
    );

    engine.cancel_invoice(&invoice.id).await.unwrap();

    assert_eq!(stock_of(&db, &product.id).await, 10);
    let account = customer_of(&db, &customer.id).await;
    assert_eq!(account.outstanding_balance, Money::ZERO);
    assert_eq!(account.total_purchases, Money::from_major(630));

    let stored = engine.get_invoice(&invoice.id).await.unwrap();
    assert_eq!(stored.status, InvoiceStatus::Cancelled);
    assert!(stored.cancelled_at.is_some());

    let err = engine.cancel_invoice(&invoice.id).await.unwrap_err();
    assert!(matches!(err, BillingError::InvalidTransition { .. }));
    assert_eq!(stock_of(&db, &product.id).await, 10);
}

#[tokio::test]
async fn test_cancel_partially_paid_reverses_only_the_balance() {
    let (engine, _) = memory_engine().await;
    let db = engine.db().clone();
    let product = add_product(&db, "TOOL-SPRY", Money::from_major(1000), 0, 5).await;
    let customer = add_customer(&db, "Krishi Seva Kendra").await;
    let invoice = engine
        .create_invoice(CreateInvoiceCommand::new(
            &customer.id,
            vec![InvoiceLineCommand::new(&product.id, 1)],
        ))
        .await
        .unwrap()
        .into_value();
    engine.record_payment(pay(&invoice.id, 300)).await.unwrap();

    engine
        .set_status(&invoice.id, InvoiceStatus::Cancelled, StatusContext::default())
        .await
        .unwrap();

    assert_eq!(customer_of(&db, &customer.id).await.outstanding_balance, Money::ZERO);
    assert_eq!(stock_of(&db, &product.id).await, 5);
}

#[tokio::test]
async fn test_paid_invoice_cannot_be_cancelled() {
    let (engine, _) = memory_engine().await;
    let db = engine.db().clone();
    let product = add_product(&db, "FEED-MIN", Money::from_major(140), 0, 5).await;
    let customer = add_customer(&db, "Sunita Devi").await;
    let invoice = engine
        .create_invoice(CreateInvoiceCommand::new(
            &customer.id,
            vec![InvoiceLineCommand::new(&product.id, 1)],
        ))
        .await
        .unwrap()
        .into_value();
    engine.record_payment(pay(&invoice.id, 140)).await.unwrap();

    let err = engine.cancel_invoice(&invoice.id).await.unwrap_err();
    assert!(matches!(
        err,
        BillingError::InvalidTransition {
            status: InvoiceStatus::Paid,
            ..
        }
    ));
    assert_eq!(stock_of(&db, &product.id).await, 4);
}

#[tokio::test]
async fn test_delete_with_payments_is_refused() {
    let (engine, _) = memory_engine().await;
    let db = engine.db().clone();
    let product = add_product(&db, "FERT-NPK", Money::from_major(1470), 0, 10).await;
    let customer = add_customer(&db, "Ramesh Patil").await;
    let invoice = engine
        .create_invoice(CreateInvoiceCommand::new(
            &customer.id,
            vec![InvoiceLineCommand::new(&product.id, 2)],
        ))
        .await
        .unwrap()
        .into_value();
    engine.record_payment(pay(&invoice.id, 100)).await.unwrap();

    let err = engine.delete_invoice(&invoice.id).await.unwrap_err();
    assert!(matches!(err, BillingError::InvalidTransition { .. }));

    let stored = engine.get_invoice(&invoice.id).await.unwrap();
    assert_eq!(stored.amount_paid, Money::from_major(100));
    assert_eq!(stock_of(&db, &product.id).await, 8);
    assert_eq!(
        customer_of(&db, &customer.id).await.outstanding_balance,
        Money::from_major(2840)
    );
}

#[tokio::test]
async fn test_delete_unpaid_undoes_everything() {
    let (engine, _) = memory_engine().await;
    let db = engine.db().clone();
    let product = add_product(&db, "SEED-PAD", Money::from_major(950), 0, 10).await;
    let customer = add_customer(&db, "Lakshmi Narayanan").await;
    let invoice = engine
        .create_invoice(CreateInvoiceCommand::new(
            &customer.id,
            vec![InvoiceLineCommand::new(&product.id, 4)],
        ))
        .await
        .unwrap()
        .into_value();

    engine.delete_invoice(&invoice.id).await.unwrap();

    assert_eq!(stock_of(&db, &product.id).await, 10);
    assert_eq!(customer_of(&db, &customer.id).await.outstanding_balance, Money::ZERO);
    assert!(matches!(
        engine.get_invoice(&invoice.id).await,
        Err(BillingError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_delete_after_cancel_does_not_release_twice() {
    let (engine, _) = memory_engine().await;
    let db = engine.db().clone();
    let product = add_product(&db, "SEED-MZE", Money::from_major(1250), 0, 10).await;
    let customer = add_customer(&db, "Gurpreet Singh").await;
    let invoice = engine
        .create_invoice(CreateInvoiceCommand::new(
            &customer.id,
            vec![InvoiceLineCommand::new(&product.id, 3)],
        ))
        .await
        .unwrap()
        .into_value();
    let other = engine
        .create_invoice(CreateInvoiceCommand::new(
            &customer.id,
            vec![InvoiceLineCommand::new(&product.id, 1)],
        ))
        .await
        .unwrap()
        .into_value();

    engine.cancel_invoice(&invoice.id).await.unwrap();
    engine.delete_invoice(&invoice.id).await.unwrap();

    assert_eq!(stock_of(&db, &product.id).await, 9);
    assert_eq!(
        customer_of(&db, &customer.id).await.outstanding_balance,
        other.total
    );
}

// =============================================================================
// Details and notifications
// =============================================================================

#[tokio::test]
async fn test_update_details() {
    let (engine, _) = memory_engine().await;
    let db = engine.db().clone();
    let product = add_product(&db, "TOOL-HOSE", Money::from_major(1100), 18, 10).await;
    let customer = add_customer(&db, "Krishi Seva Kendra").await;
    let invoice = engine
        .create_invoice(
            CreateInvoiceCommand::new(&customer.id, vec![InvoiceLineCommand::new(&product.id, 1)])
                .with_notes("deliver by tractor"),
        )
        .await
        .unwrap()
        .into_value();

    let due = NaiveDate::from_ymd_opt(2024, 5, 15).unwrap();
    let updated = engine
        .update_details(UpdateInvoiceCommand::new(&invoice.id).due_date(due).clear_notes())
        .await
        .unwrap();
    assert_eq!(updated.due_date, due);
    assert_eq!(updated.notes, None);
    assert_eq!(updated.version, invoice.version + 1);
    assert_eq!(updated.total, invoice.total);

    let err = engine
        .update_details(UpdateInvoiceCommand::new(&invoice.id))
        .await
        .unwrap_err();
    assert!(matches!(err, BillingError::Validation(_)));

    engine.cancel_invoice(&invoice.id).await.unwrap();
    let err = engine
        .update_details(UpdateInvoiceCommand::new(&invoice.id).notes("too late"))
        .await
        .unwrap_err();
    assert!(matches!(err, BillingError::InvalidTransition { .. }));
}

#[tokio::test]
async fn test_notification_failure_is_a_warning() {
    let (engine, _) = memory_engine().await;
    let engine: BillingEngine = engine.with_dispatcher(Arc::new(FailingDispatcher));
    let db = engine.db().clone();
    let product = add_product(&db, "FERT-ZN", Money::from_major(520), 12, 10).await;
    let customer = add_customer(&db, "Ramesh Patil").await;

    let created = engine
        .create_invoice(CreateInvoiceCommand::new(
            &customer.id,
            vec![InvoiceLineCommand::new(&product.id, 1)],
        ))
        .await
        .unwrap();

    assert_eq!(created.warnings.len(), 1);
    assert!(matches!(
        &created.warnings[0],
        BillingWarning::NotificationFailed { event, .. } if event == "invoice_created"
    ));
    assert!(engine.get_invoice(&created.value.id).await.is_ok());
}

fn uuid_like() -> String {
    // A well-formed id that no fixture ever creates
    "00000000-0000-4000-8000-000000000000".to_string()
}
