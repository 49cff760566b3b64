//! Starter data for a fresh store.
//!
//! A brand-new database has nothing for the tools to search, which makes
//! every conversation a dead end. On startup the service seeds a small
//! menu and knowledge base, but only when the menu table is empty so a
//! curated catalog is never overwritten.

use forno_store::{KbChunk, MenuItem, SqliteStore};

/// Seed the menu and knowledge base unless menu data already exists.
pub async fn seed_if_empty(store: &SqliteStore) -> anyhow::Result<()> {
    if !store.all_menu_items(1).await?.is_empty() {
        tracing::debug!("Store already has menu data, skipping seed");
        return Ok(());
    }

    let items = default_menu();
    for item in &items {
        store.insert_menu_item(item).await?;
    }

    let chunks = default_kb();
    for chunk in &chunks {
        store.insert_kb_chunk(chunk).await?;
    }

    tracing::info!(
        menu_items = items.len(),
        kb_chunks = chunks.len(),
        "Seeded starter menu and knowledge base"
    );
    Ok(())
}

fn pizza(
    id: &str,
    name: &str,
    price: f64,
    category: &str,
    description: &str,
    tags: &[&str],
) -> MenuItem {
    MenuItem {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        category: category.to_string(),
        price,
        tags: tags.iter().map(|t| t.to_string()).collect(),
        available: true,
    }
}

fn default_menu() -> Vec<MenuItem> {
    vec![
        pizza(
            "pepperoni_classic",
            "Pepperoni Classic",
            12.99,
            "non-veg",
            "Traditional pepperoni pizza with mozzarella cheese and our signature tomato sauce",
            &["popular", "classic", "spicy"],
        ),
        pizza(
            "margherita",
            "Margherita",
            10.99,
            "veg",
            "Simple and delicious with fresh mozzarella, basil, and tomato sauce",
            &["popular", "classic", "vegetarian"],
        ),
        pizza(
            "bbq_chicken",
            "BBQ Chicken",
            14.99,
            "non-veg",
            "Grilled chicken with BBQ sauce, red onions, and cilantro",
            &["popular", "bbq", "chicken"],
        ),
        pizza(
            "veggie_supreme",
            "Veggie Supreme",
            13.99,
            "veg",
            "Loaded with bell peppers, mushrooms, onions, olives, and tomatoes",
            &["vegetarian", "healthy", "loaded"],
        ),
        pizza(
            "meat_lovers",
            "Meat Lovers",
            16.99,
            "non-veg",
            "Loaded with pepperoni, sausage, bacon, and ham",
            &["popular", "meat", "protein-packed"],
        ),
        pizza(
            "four_cheese",
            "Four Cheese",
            14.99,
            "veg",
            "A cheese lover's dream with mozzarella, parmesan, gorgonzola, and provolone",
            &["cheese", "creamy", "gourmet"],
        ),
        pizza(
            "spicy_devil",
            "Spicy Devil",
            15.99,
            "non-veg",
            "Extra spicy with jalapenos, hot sauce, pepperoni, and red chili flakes",
            &["spicy", "hot", "extreme"],
        ),
        pizza(
            "hawaiian",
            "Hawaiian Paradise",
            13.99,
            "non-veg",
            "Ham and pineapple with mozzarella on a tomato base",
            &["tropical", "sweet"],
        ),
        pizza(
            "mushroom_truffle",
            "Mushroom & Truffle",
            17.99,
            "veg",
            "Gourmet pizza with mixed mushrooms, truffle oil, and parmesan",
            &["gourmet", "luxury", "earthy"],
        ),
        pizza(
            "buffalo_chicken",
            "Buffalo Chicken",
            15.99,
            "non-veg",
            "Spicy buffalo chicken with ranch dressing, celery, and blue cheese",
            &["spicy", "chicken", "ranch"],
        ),
    ]
}

fn chunk(id: &str, category: &str, title: &str, body: &str) -> KbChunk {
    KbChunk {
        id: id.to_string(),
        title: title.to_string(),
        category: category.to_string(),
        body: body.to_string(),
    }
}

fn default_kb() -> Vec<KbChunk> {
    vec![
        chunk(
            "delivery-time",
            "Delivery",
            "Delivery Time",
            "Average delivery time is 25-35 minutes. During peak hours (6-9 PM) it may \
             take up to 45 minutes. Orders come with real-time tracking and an estimated \
             arrival time.",
        ),
        chunk(
            "delivery-areas",
            "Delivery",
            "Delivery Areas",
            "We deliver within a 10km radius of each store. Delivery is free on orders \
             over $25, otherwise a $3 delivery fee applies.",
        ),
        chunk(
            "pickup",
            "Delivery",
            "Pickup Option",
            "Order online and choose pickup to skip the delivery fee. Pickup orders get \
             10% off and are usually ready in 15-20 minutes. Show your order ID at the \
             counter.",
        ),
        chunk(
            "payment-methods",
            "Payment",
            "Payment Methods",
            "We accept credit and debit cards (Visa, Mastercard, Amex), cash on \
             delivery, and digital wallets (PayPal, Google Pay, Apple Pay). All online \
             payments are SSL encrypted.",
        ),
        chunk(
            "cash-on-delivery",
            "Payment",
            "Cash on Delivery",
            "Cash on delivery is available for orders under $100. Select cash at \
             checkout and have change ready; drivers carry at most $20 in change.",
        ),
        chunk(
            "pizza-sizes",
            "Menu",
            "Pizza Sizes",
            "Small is 10 inches with 6 slices, medium is 12 inches with 8 slices, large \
             is 14 inches with 10 slices, and family is 16 inches with 12 slices. Prices \
             vary by toppings.",
        ),
        chunk(
            "vegetarian-options",
            "Menu",
            "Vegetarian Options",
            "Vegetarian pizzas include Margherita, Veggie Supreme, Four Cheese, and \
             Mushroom & Truffle. Vegan cheese is available for $2 extra, and gluten-free \
             crust for $3 extra.",
        ),
        chunk(
            "combo-deals",
            "Offers",
            "Combo Deals",
            "Current combos: 2 large pizzas + garlic bread + 2L soda for $35, family \
             pack with 3 medium pizzas + wings + dessert for $45, student meal with 1 \
             medium pizza + drink for $12. Deals change weekly.",
        ),
        chunk(
            "track-order",
            "Tracking",
            "How to Track Order",
            "Ask for your order status anytime with your order ID. Statuses move from \
             created to preparing, baking, out for delivery, and delivered.",
        ),
        chunk(
            "cancel-order",
            "Support",
            "Cancel Order",
            "Orders can be cancelled free of charge within 5 minutes of placing them. \
             Once the kitchen starts preparing, cancellation is no longer possible; \
             contact support for help.",
        ),
        chunk(
            "contact-support",
            "Support",
            "Contact Support",
            "Reach support on WhatsApp, by phone at 1-800-PIZZA-NOW, or through the \
             feedback form. Support hours are 11am to 11pm, seven days a week.",
        ),
        chunk(
            "opening-hours",
            "Store Info",
            "Opening Hours",
            "We are open every day from 11am to 11pm, including holidays. Last orders \
             are taken 30 minutes before closing.",
        ),
    ]
}
