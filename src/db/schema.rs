pub const SCHEMA: &str = r#"
-- Listing drafts with their listing-level verification fields
CREATE TABLE IF NOT EXISTS listings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    category TEXT NOT NULL,
    review_status TEXT NOT NULL DEFAULT 'pending',  -- 'pending', 'approved', 'rejected'

    -- Claimed location
    latitude REAL,
    longitude REAL,

    -- Copied from the best photo
    verification_status TEXT,
    location_verified INTEGER NOT NULL DEFAULT 0,
    distance_from_listing REAL,
    last_verified_at TEXT,

    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    updated_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_listings_review_status ON listings(review_status);

-- Photos attached to a listing, position 0 is the cover image
CREATE TABLE IF NOT EXISTS listing_photos (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    listing_id INTEGER NOT NULL,
    position INTEGER NOT NULL,
    image TEXT NOT NULL,
    fingerprint TEXT,  -- SHA-256 of the image content
    file_name TEXT NOT NULL,
    capture_method TEXT NOT NULL,  -- 'CAMERA', 'UPLOAD'

    -- Extracted metadata
    gps_latitude REAL,
    gps_longitude REAL,
    taken_at TEXT,
    device_info TEXT,

    -- Verification result
    status TEXT NOT NULL,
    location_match INTEGER NOT NULL DEFAULT 0,
    distance_km REAL NOT NULL,
    photo_age_days INTEGER NOT NULL,
    requires_reverification INTEGER NOT NULL DEFAULT 0,
    details TEXT NOT NULL,

    UNIQUE (listing_id, position),
    FOREIGN KEY (listing_id) REFERENCES listings(id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_listing_photos_listing ON listing_photos(listing_id);
CREATE INDEX IF NOT EXISTS idx_listing_photos_fingerprint ON listing_photos(fingerprint);
"#;

/// Schema changes applied after `SCHEMA`, in order. Each statement must be
/// safe to re-run against a database that already has it.
pub const MIGRATIONS: &[&str] = &[];
