//! SQL used by `PostgresStore`. Plain bind-parameter queries so the crate
//! builds without a live database.

pub const INSERT_LISTING: &str = r#"
    INSERT INTO listings (owner_id, status, start_price, current_price, reserve_price,
                          reserve_met, buy_now_price, start_time, end_time, created_at)
    VALUES ($1, $2, $3, $3, $4, FALSE, $5, $6, $7, $8)
    RETURNING id, owner_id, status, start_price, current_price, reserve_price,
              reserve_met, buy_now_price, start_time, end_time, created_at
"#;

pub const GET_LISTING: &str = r#"
    SELECT id, owner_id, status, start_price, current_price, reserve_price,
           reserve_met, buy_now_price, start_time, end_time, created_at
    FROM listings WHERE id = $1
"#;

pub const ALL_LISTINGS: &str = r#"
    SELECT id, owner_id, status, start_price, current_price, reserve_price,
           reserve_met, buy_now_price, start_time, end_time, created_at
    FROM listings ORDER BY created_at DESC, id DESC
"#;

pub const UPDATE_LISTING: &str = r#"
    UPDATE listings
    SET status = $2, current_price = $3, reserve_met = $4, end_time = $5
    WHERE id = $1
"#;

pub const DUE_LISTINGS: &str = r#"
    SELECT id, owner_id, status, start_price, current_price, reserve_price,
           reserve_met, buy_now_price, start_time, end_time, created_at
    FROM listings
    WHERE status = 'live' AND end_time <= $1
    ORDER BY end_time ASC, id ASC
    LIMIT $2
"#;

pub const ACTIVATE_SCHEDULED: &str = r#"
    UPDATE listings SET status = 'live'
    WHERE status = 'scheduled' AND start_time <= $1
"#;

pub const INSERT_BID: &str = r#"
    INSERT INTO bids (listing_id, bidder_id, amount, is_auto_bid, created_at)
    VALUES ($1, $2, $3, $4, $5)
    RETURNING id, listing_id, bidder_id, amount, is_auto_bid, created_at
"#;

pub const BIDS_FOR_LISTING: &str = r#"
    SELECT id, listing_id, bidder_id, amount, is_auto_bid, created_at
    FROM bids
    WHERE listing_id = $1
    ORDER BY amount DESC, created_at ASC, id ASC
"#;

pub const HIGHEST_BID: &str = r#"
    SELECT id, listing_id, bidder_id, amount, is_auto_bid, created_at
    FROM bids
    WHERE listing_id = $1
    ORDER BY amount DESC, created_at ASC, id ASC
    LIMIT 1
"#;

pub const UPSERT_AUTO_BID: &str = r#"
    INSERT INTO auto_bids (user_id, listing_id, max_amount, enabled, created_at, updated_at)
    VALUES ($1, $2, $3, TRUE, $4, $4)
    ON CONFLICT (user_id, listing_id)
    DO UPDATE SET max_amount = $3, enabled = TRUE, updated_at = $4
    RETURNING id, user_id, listing_id, max_amount, enabled, created_at, updated_at
"#;

pub const GET_AUTO_BID: &str = r#"
    SELECT id, user_id, listing_id, max_amount, enabled, created_at, updated_at
    FROM auto_bids WHERE user_id = $1 AND listing_id = $2
"#;

pub const DISABLE_AUTO_BID: &str = r#"
    UPDATE auto_bids SET enabled = FALSE, updated_at = $3
    WHERE user_id = $1 AND listing_id = $2
"#;

pub const ENABLED_AUTO_BIDS: &str = r#"
    SELECT id, user_id, listing_id, max_amount, enabled, created_at, updated_at
    FROM auto_bids
    WHERE listing_id = $1 AND enabled = TRUE
    ORDER BY created_at ASC, id ASC
"#;

pub const INSERT_TRANSACTION: &str = r#"
    INSERT INTO transactions (listing_id, buyer_id, final_price, status, created_at)
    VALUES ($1, $2, $3, 'pending', $4)
    ON CONFLICT (listing_id) DO NOTHING
    RETURNING id, listing_id, buyer_id, final_price, status, created_at
"#;

pub const TRANSACTION_FOR_LISTING: &str = r#"
    SELECT id, listing_id, buyer_id, final_price, status, created_at
    FROM transactions WHERE listing_id = $1
"#;

pub const USER_AGREEMENT: &str = r#"
    SELECT bidding_agreement_accepted FROM users WHERE id = $1
"#;

pub const INSERT_NOTIFICATION: &str = r#"
    INSERT INTO notifications (user_id, kind, payload, created_at)
    VALUES ($1, $2, $3, $4)
"#;
