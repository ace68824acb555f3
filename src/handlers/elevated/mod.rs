// Platform administration under /api/admin. Runs behind the same middleware
// as the protected tier; `authorize` requires an admin or super admin role.
pub mod admin;
