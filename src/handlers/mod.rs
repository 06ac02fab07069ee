// handlers/mod.rs - two security tiers plus the websocket upgrade
//
// Public (no auth) → Protected (session cookie JWT)
pub mod protected; // Tier 2: JWT cookie required ({base}/me, {base}/spots/*)
pub mod public; // Tier 1: No authentication required (/, {base}/health)
pub mod ws; // Websocket upgrade, authenticates the cookie itself
