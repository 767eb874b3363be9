//! Raffle Core Demo
//!
//! Walkthrough of the number-allocation and review workflow showing:
//! - Raffle creation and activation
//! - Two buyers racing for overlapping numbers (exactly one wins)
//! - Reviewer verification and rejection with released numbers
//! - The storefront state feed superseding its snapshot
//! - Winner declaration from a confirmed number
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin demo
//! ```

use anyhow::Context;
use rifa_core::providers::{ConsoleNotifier, MemoryProofStore, SystemClock};
use rifa_core::workflow::NewPurchase;
use rifa_core::{
    BuyerInfo, CoreConfig, DEFAULT_TICKET_PRICE, DEFAULT_TOTAL_NUMBERS, FeedCadence, NewRaffle,
    PaymentMethod, ProofUpload, RaffleId, RaffleStatus, RequestStatus, ReservationLedger,
    ReviewWorkflow, StateSyncFeed, TicketNumber, WorkflowEnvironment, stats,
};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn purchase(raffle_id: RaffleId, values: &[u32], name: &str, email: &str) -> NewPurchase {
    NewPurchase {
        raffle_id,
        quantity: values.len() as u32,
        numbers: values.iter().copied().map(TicketNumber::new).collect(),
        buyer: BuyerInfo {
            full_name: name.to_string(),
            email: email.to_string(),
            phone: "4129981122".to_string(),
        },
        method: PaymentMethod::MobilePayment,
        reference: "482913".to_string(),
        proof: ProofUpload {
            file_name: "receipt.jpg".to_string(),
            content_type: "image/jpeg".to_string(),
            bytes: vec![0xFF, 0xD8, 0xFF, 0xE0],
        },
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,rifa_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!("\n🎟️  ============================================");
    println!("   Raffle Core - Live Demo");
    println!("============================================\n");

    // Load configuration; fast polling so the demo doesn't stall on the
    // production cadences.
    let mut config = CoreConfig::from_env();
    config.storefront_poll_interval = Duration::from_millis(250);
    config.review_poll_interval = Duration::from_millis(250);

    let environment = WorkflowEnvironment::new(
        Arc::new(ConsoleNotifier::new()),
        Arc::new(MemoryProofStore::new()),
        Arc::new(SystemClock::new()),
        config,
    );
    let workflow = Arc::new(ReviewWorkflow::new(
        Arc::new(ReservationLedger::new()),
        environment,
    ));

    println!("✓ Workflow initialized\n");

    // ========== Demo Scenario ==========

    println!("📋 Demo Scenario: Motorcycle Raffle");
    println!("   Prize: Yamaha MT-07");
    println!("   Numbers: 0-99 at $8.00 each\n");

    // Step 1: Open the raffle and start selling
    println!("1️⃣  Opening raffle...");

    let raffle = workflow
        .open_raffle(NewRaffle {
            title: "Yamaha MT-07 Prize Draw".to_string(),
            description: "Win a Yamaha MT-07, drawn live".to_string(),
            price: DEFAULT_TICKET_PRICE,
            total_numbers: DEFAULT_TOTAL_NUMBERS,
            draw_date: chrono::Utc::now() + chrono::Duration::days(30),
        })
        .await?;
    let raffle_id = raffle.id;

    workflow
        .ledger()
        .set_raffle_status(raffle_id, RaffleStatus::Active)
        .await?;

    println!("   ✓ Raffle opened: {raffle_id}");
    println!("   ✓ Status: Active, 100 numbers available\n");

    // Step 2: Storefront feed goes live before anyone buys
    println!("2️⃣  Subscribing the storefront number grid...");

    let feed = StateSyncFeed::new(Arc::clone(&workflow));
    let mut grid = feed.watch_pool(raffle_id, FeedCadence::Storefront).await?;

    let counts = grid.latest().counts();
    println!(
        "   ✓ Feed live: {} available / {} reserved / {} confirmed\n",
        counts.available, counts.reserved, counts.confirmed
    );

    // Step 3: Two buyers race for overlapping numbers
    println!("3️⃣  Maria wants numbers 2, 3 and Carlos wants 3, 4. Racing...");

    let maria_task = {
        let workflow = Arc::clone(&workflow);
        tokio::spawn(async move {
            workflow
                .submit(purchase(raffle_id, &[2, 3], "Maria Gonzalez", "maria@example.com"))
                .await
        })
    };
    let carlos_task = {
        let workflow = Arc::clone(&workflow);
        tokio::spawn(async move {
            workflow
                .submit(purchase(raffle_id, &[3, 4], "Carlos Perez", "carlos@example.com"))
                .await
        })
    };

    let (maria, carlos) = tokio::join!(maria_task, carlos_task);
    let mut winner = None;
    for outcome in [maria?, carlos?] {
        match outcome {
            Ok(request) => {
                println!(
                    "   ✓ {} reserved numbers {}",
                    request.buyer.full_name,
                    request.numbers_display()
                );
                winner = Some(request);
            }
            Err(err) => println!("   ✗ Second claim refused: {err}"),
        }
    }
    let winning_request = winner.context("exactly one racing submission should win")?;
    println!("   ✓ Number 3 has exactly one claimant\n");

    // Step 4: The losing buyer retries with free numbers
    println!("4️⃣  Losing buyer retries with numbers 10, 11...");

    let retry = workflow
        .submit(purchase(raffle_id, &[10, 11], "Carlos Perez", "carlos@example.com"))
        .await?;
    println!("   ✓ Reserved numbers {}\n", retry.numbers_display());

    // Step 5: Reviewer works the queue
    println!("5️⃣  Reviewer verifying and rejecting...");

    let pending = workflow.list_by_status(raffle_id, RequestStatus::Pending).await;
    println!("   Queue: {} pending requests", pending.len());

    let verified = workflow.verify(winning_request.id).await?;
    println!(
        "   ✓ Verified {}: numbers {} confirmed",
        verified.buyer.full_name,
        verified.numbers_display()
    );

    let rejected = workflow
        .reject(retry.id, "reference not found in bank statement")
        .await?;
    println!(
        "   ✓ Rejected {}: numbers {} released back to the pool\n",
        rejected.buyer.full_name,
        rejected.numbers_display()
    );

    // Step 6: The feed supersedes its snapshot on the next poll
    println!("6️⃣  Waiting for the storefront feed to catch up...");

    grid.changed().await;
    let snapshot = grid.latest();
    println!("   ✓ Snapshot version {}", snapshot.version);
    println!("{}\n", serde_json::to_string_pretty(&snapshot.counts())?);

    // Step 7: Declare the winner from a confirmed number
    println!("7️⃣  Drawing the winning number...");

    let winning_number = verified
        .numbers
        .iter()
        .copied()
        .next()
        .context("verified request holds at least one number")?;
    let completed = workflow.declare_winner(raffle_id, winning_number).await?;

    println!("   ✓ Winning number: {winning_number}");
    println!("   ✓ Raffle status: {:?}\n", completed.status);

    // Step 8: Final numbers
    println!("8️⃣  Final State:");

    let report = stats::raffle_stats(&workflow, raffle_id).await?;
    println!("   📊 {}:", report.title);
    println!("      - Confirmed numbers: {}", report.numbers.confirmed);
    println!("      - Available numbers: {}", report.numbers.available);
    println!("      - Progress: {}%", report.progress_percent);
    println!("      - Revenue: {}", report.revenue);

    let overview = stats::overview(&workflow).await?;
    println!("\n   💰 Across all raffles:");
    println!("      - Completed raffles: {}", overview.completed_raffles);
    println!("      - Pending reviews: {}", overview.pending_reviews);
    println!("      - Total revenue: {}", overview.total_revenue);

    println!("\n✨ Demo completed successfully!");
    println!("\n📝 What happened:");
    println!("   1. Raffle opened with 100 numbers and activated");
    println!("   2. Storefront feed subscribed and primed");
    println!("   3. Overlapping claims raced; exactly one reserved number 3");
    println!("   4. The loser retried with free numbers");
    println!("   5. Reviewer confirmed one purchase and rejected the other");
    println!("   6. Rejected numbers returned to the pool; the feed caught up");
    println!("   7. A confirmed number won and the raffle completed");

    Ok(())
}
