pub const SCHEMA: &str = r#"
-- Accounts. An account is pending until activation_code is consumed.
CREATE TABLE IF NOT EXISTS users (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    email TEXT NOT NULL,
    password_hash TEXT NOT NULL,          -- argon2id hash with embedded salt
    picture TEXT,

    -- Signup activation; NULL once the account is active
    activation_code TEXT,

    -- Password recovery; replaced on each new request
    reset_code TEXT,
    reset_code_expires_at TEXT,

    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now')),
    deleted_at TEXT
);

-- Companies are the tenant boundary
CREATE TABLE IF NOT EXISTS companies (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    slug TEXT NOT NULL,
    description TEXT,
    email TEXT,
    phone TEXT,
    address TEXT,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now')),
    deleted_at TEXT
);

-- Two per company, seeded at creation: one admin, one plain member
CREATE TABLE IF NOT EXISTS roles (
    id TEXT PRIMARY KEY,
    company_id TEXT NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    is_admin INTEGER NOT NULL DEFAULT 0,
    created_at TEXT DEFAULT (datetime('now'))
);

-- Membership of a user in a company through a role
CREATE TABLE IF NOT EXISTS memberships (
    company_id TEXT NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    role_id TEXT NOT NULL REFERENCES roles(id) ON DELETE RESTRICT,
    last_visited_at TEXT,
    created_at TEXT DEFAULT (datetime('now')),
    PRIMARY KEY (company_id, user_id)
);

-- Invitations to join a company, addressed to an email that may not yet
-- have an account. status: 0 awaiting, 1 joined, 2 declined.
CREATE TABLE IF NOT EXISTS invitations (
    id TEXT PRIMARY KEY,
    company_id TEXT NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    email TEXT NOT NULL,
    message TEXT NOT NULL DEFAULT '',
    sender_id TEXT NOT NULL REFERENCES users(id),
    resolver_id TEXT REFERENCES users(id),
    status INTEGER NOT NULL DEFAULT 0,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now')),
    deleted_at TEXT
);

-- Posts. status: 0 draft, 1 scheduled, 2 published.
CREATE TABLE IF NOT EXISTS posts (
    id TEXT PRIMARY KEY,
    company_id TEXT NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    author_id TEXT NOT NULL REFERENCES users(id),
    title TEXT NOT NULL,
    content TEXT NOT NULL,
    status INTEGER NOT NULL DEFAULT 0,
    scheduled_at TEXT,
    published_at TEXT,
    created_at TEXT DEFAULT (datetime('now')),
    updated_at TEXT DEFAULT (datetime('now')),
    deleted_at TEXT
);

-- Session tokens issued at login
CREATE TABLE IF NOT EXISTS session_tokens (
    id TEXT PRIMARY KEY,
    token_hash TEXT NOT NULL,             -- argon2id hash with embedded salt
    token_lookup TEXT NOT NULL,           -- first 8 chars of the raw token id
    user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    created_at TEXT DEFAULT (datetime('now')),
    expires_at TEXT,                      -- NULL = never
    last_used_at TEXT
);

-- One active account per email address
CREATE UNIQUE INDEX IF NOT EXISTS idx_users_email
    ON users(email) WHERE deleted_at IS NULL;

-- Slugs are unique among live companies only
CREATE UNIQUE INDEX IF NOT EXISTS idx_companies_slug
    ON companies(slug) WHERE deleted_at IS NULL;

-- At most one awaiting invitation per (company, email). This index, not the
-- application-level existence check, is what holds under concurrent invites.
CREATE UNIQUE INDEX IF NOT EXISTS idx_invitations_pending
    ON invitations(company_id, email) WHERE deleted_at IS NULL AND status = 0;

CREATE UNIQUE INDEX IF NOT EXISTS idx_session_tokens_lookup ON session_tokens(token_lookup);
CREATE INDEX IF NOT EXISTS idx_session_tokens_user ON session_tokens(user_id);
CREATE INDEX IF NOT EXISTS idx_roles_company ON roles(company_id);
CREATE INDEX IF NOT EXISTS idx_memberships_user ON memberships(user_id);
CREATE INDEX IF NOT EXISTS idx_invitations_company ON invitations(company_id);
CREATE INDEX IF NOT EXISTS idx_invitations_email ON invitations(email);
CREATE INDEX IF NOT EXISTS idx_posts_company_published ON posts(company_id, published_at);
CREATE INDEX IF NOT EXISTS idx_posts_company_updated ON posts(company_id, updated_at);
"#;
