//! Farm Trade Example
//!
//! Two farmers on one machine trade over a loopback connection.
//! Alice swaps two eggs for Bob's chicken; then a second trade fails at
//! commit because Alice's offered egg is gone by the time it is applied.

use barter_core::{ItemId, PartyId, PartyInfo};
use barter_script::Loader;
use barter_session::{
    CommitAuthority, CommitOutcome, CommitProposal, CommitRejection, Inventory, MemoryInventory,
    TradeController,
};
use barter_sync::{LoopbackConnection, SyncAdapter};
use std::cell::RefCell;
use std::rc::Rc;

const ITEMS: &str = r#"(
    items: [
        (item_type: "Egg", display_name: "Egg", default_rarity: Some(Common)),
        (item_type: "Chicken", display_name: "Chicken", description: "Lays eggs"),
        (item_type: "Milk", display_name: "Milk"),
    ],
)"#;

const CONFIG: &str = "(pending_timeout_ticks: 120, max_queued_requests: 4)";

const INVENTORIES: &str = r#"(
    inventories: [
        (
            party: "alice",
            items: [
                (id: "egg-1", item_type: "Egg", attributes: (rarity: Some(Common))),
                (id: "egg-2", item_type: "Egg", attributes: (rarity: Some(Common))),
                (id: "egg-3", item_type: "Egg", attributes: (rarity: Some(Common))),
                (id: "egg-gold", item_type: "Egg", attributes: (rarity: Some(Legendary))),
            ],
        ),
        (
            party: "bob",
            items: [
                (id: "chicken-1", item_type: "Chicken", attributes: (rarity: Some(Rare))),
                (id: "milk-1", item_type: "Milk", attributes: (tier: Some(2))),
            ],
        ),
    ],
)"#;

/// The authoritative simulation: owns items, applies paired commits
#[derive(Default)]
struct Market {
    inventory: MemoryInventory,
    waiting: Vec<CommitProposal>,
    outcomes: Vec<(PartyId, CommitOutcome)>,
}

impl Market {
    fn settle_pair(&mut self, first: CommitProposal, second: CommitProposal) {
        let result = self.swap(&first);
        for proposal in [&first, &second] {
            self.outcomes.push((
                proposal.local_party.clone(),
                CommitOutcome {
                    ticket: proposal.ticket,
                    result: result.clone(),
                },
            ));
        }
    }

    /// Apply both sides of a trade, or neither
    fn swap(&mut self, proposal: &CommitProposal) -> Result<(), CommitRejection> {
        let (a, b) = (&proposal.local_party, &proposal.partner);
        for (owner, ids) in [(a, &proposal.local_item_ids), (b, &proposal.partner_item_ids)] {
            if let Some(missing) = ids.iter().find(|id| self.inventory.find_item(owner, id).is_none()) {
                return Err(CommitRejection::ItemNoLongerOwned(missing.clone()));
            }
        }
        self.inventory
            .transfer(a, b, &proposal.local_item_ids)
            .map_err(CommitRejection::ItemNoLongerOwned)?;
        self.inventory
            .transfer(b, a, &proposal.partner_item_ids)
            .map_err(CommitRejection::ItemNoLongerOwned)
    }
}

/// One party's view of the shared market
#[derive(Clone)]
struct MarketHandle(Rc<RefCell<Market>>);

impl CommitAuthority for MarketHandle {
    fn request_trade(&mut self, from: &PartyInfo, to: &PartyId) {
        tracing::info!(from = %from.id, %to, "trade requested");
    }

    fn submit_commit(&mut self, proposal: CommitProposal) {
        let mut market = self.0.borrow_mut();
        match market.waiting.iter().position(|p| p.mirrors(&proposal)) {
            Some(index) => {
                let first = market.waiting.remove(index);
                market.settle_pair(first, proposal);
            }
            None => market.waiting.push(proposal),
        }
    }
}

impl Inventory for MarketHandle {
    fn owned_items(&self, party: &PartyId) -> Vec<barter_core::ItemInstance> {
        self.0.borrow().inventory.owned_items(party)
    }
}

type Farmer = TradeController<MarketHandle, MarketHandle>;

struct Table {
    market: MarketHandle,
    alice: Farmer,
    bob: Farmer,
    alice_sync: SyncAdapter<LoopbackConnection>,
    bob_sync: SyncAdapter<LoopbackConnection>,
}

impl Table {
    /// Exchange traffic and commit outcomes until both sides are quiet
    fn settle(&mut self) {
        loop {
            let sent = self.alice_sync.flush_outbound(&mut self.alice).delivered
                + self.bob_sync.flush_outbound(&mut self.bob).delivered;
            self.alice_sync.pump_inbound(&mut self.alice);
            self.bob_sync.pump_inbound(&mut self.bob);

            let outcomes = std::mem::take(&mut self.market.0.borrow_mut().outcomes);
            for (party, outcome) in &outcomes {
                if party == &self.alice.local().id {
                    self.alice.handle_commit_outcome(outcome.clone());
                } else {
                    self.bob.handle_commit_outcome(outcome.clone());
                }
            }

            if sent == 0 && outcomes.is_empty() {
                break;
            }
        }
    }

    fn print_inventories(&self) {
        for farmer in [&self.alice, &self.bob] {
            println!("  {}:", farmer.local().name);
            for stack in farmer.local_stacks() {
                println!("    {} x{}", stack.stack_key, stack.count);
            }
        }
    }
}

fn farmer(info: PartyInfo, market: &MarketHandle, defs: &barter_script::TradeDefs) -> Farmer {
    let mut farmer = TradeController::with_config(info, market.clone(), market.clone(), defs.config.clone())
        .with_catalog(defs.catalog.clone());
    let name = farmer.local().name.clone();
    farmer.on_trade_request(move |request| {
        println!("  [{}] trade request from {}", name, request.from_party_name);
    });
    let name = farmer.local().name.clone();
    farmer.on_complete(move |partner| {
        println!("  [{}] trade with {} completed", name, partner.name);
    });
    let name = farmer.local().name.clone();
    farmer.on_cancel(move |partner, reason| {
        println!("  [{}] trade with {} cancelled: {}", name, partner.name, reason);
    });
    farmer
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    println!("=== Barter Farm Trade Example ===\n");

    let mut loader = Loader::new();
    loader.load_items_str(ITEMS)?;
    loader.load_config_str(CONFIG)?;
    loader.load_inventories_str(INVENTORIES)?;
    let defs = loader.finish()?;

    let market = MarketHandle(Rc::new(RefCell::new(Market {
        inventory: defs.seed_inventory(),
        ..Market::default()
    })));

    let alice_info = PartyInfo::new("alice", "Alice");
    let bob_info = PartyInfo::new("bob", "Bob");
    let (a, b) = LoopbackConnection::pair(alice_info.id.clone(), bob_info.id.clone());
    let mut alice_sync = SyncAdapter::new(alice_info.id.clone());
    alice_sync.connect(a);
    let mut bob_sync = SyncAdapter::new(bob_info.id.clone());
    bob_sync.connect(b);

    let mut table = Table {
        alice: farmer(alice_info, &market, &defs),
        bob: farmer(bob_info.clone(), &market, &defs),
        market,
        alice_sync,
        bob_sync,
    };

    println!("Starting inventories:");
    table.print_inventories();

    // Trade 1: two common eggs for a rare chicken
    println!("\nAlice invites Bob...");
    table.alice.invite(bob_info.clone());
    table.settle();
    table.bob.accept_current_request();
    table.settle();

    let eggs = table
        .alice
        .local_stacks()
        .into_iter()
        .find(|s| s.stack_key.as_str() == "Egg_Common")
        .map(|s| s.stack_key);
    if let Some(key) = eggs {
        table.alice.click_stack(&key);
        let offered = table.alice.offer_selected(2);
        println!("Alice offers {} eggs", offered.len());
    }
    table.bob.offer_item(&ItemId::new("chicken-1"));
    println!("Bob offers his chicken");
    table.settle();

    table.alice.confirm();
    table.bob.confirm();
    println!("Both confirm...");
    table.settle();

    println!("\nAfter trade 1:");
    table.print_inventories();

    // Trade 2: the golden egg disappears before the commit lands
    println!("\nBob invites Alice for the golden egg...");
    table.bob.invite(PartyInfo::new("alice", "Alice"));
    table.settle();
    table.alice.accept_current_request();
    table.settle();

    table.alice.offer_item(&ItemId::new("egg-gold"));
    table.bob.offer_item(&ItemId::new("milk-1"));
    table.settle();
    table.alice.confirm();
    table.settle();

    table
        .market
        .0
        .borrow_mut()
        .inventory
        .take(&PartyId::new("alice"), &ItemId::new("egg-gold"));
    println!("(the golden egg hatches)");

    table.bob.confirm();
    table.settle();

    println!("\nAfter trade 2:");
    table.print_inventories();

    for farmer in [&table.alice, &table.bob] {
        println!(
            "\n{} has {} trade(s) on record, {} completed",
            farmer.local().name,
            farmer.history().len(),
            farmer.history().completed_count()
        );
    }

    println!("\n=== Trading Complete ===");
    Ok(())
}
