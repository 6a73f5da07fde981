// src/admin.rs

use crate::{
    catalog::require_admin,
    error::{AppError, AppResult},
    models::{AccountStatus, Offering, Role, Viewer},
};
use async_trait::async_trait;
use log::info;

#[async_trait]
pub trait AdminBackend: Send + Sync {
    /// Every profile together with its purchases.
    async fn list_users(&self) -> AppResult<Vec<Viewer>>;
    async fn set_user_status(&self, user_id: &str, status: AccountStatus) -> AppResult<()>;
    async fn grant_product(&self, user_id: &str, product_id: &str) -> AppResult<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AdminStats {
    pub revenue: u64,
    pub active_clients: usize,
    pub blocked_users: usize,
    pub sales: usize,
}

/// Revenue sums the current price of every purchased offering; ids missing from the catalog count 0.
pub fn compute_stats(users: &[Viewer], offerings: &[Offering]) -> AdminStats {
    let price_of = |id: &str| offerings.iter().find(|o| o.id == id).map_or(0, |o| o.price);
    users.iter().fold(AdminStats::default(), |mut stats, user| {
        stats.revenue += user
            .purchased_product_ids
            .iter()
            .map(|id| price_of(id))
            .sum::<u64>();
        stats.sales += user.purchased_product_ids.len();
        match (user.role, user.status) {
            (Role::User, AccountStatus::Active) => stats.active_clients += 1,
            (_, AccountStatus::Blocked) => stats.blocked_users += 1,
            _ => {}
        }
        stats
    })
}

pub struct AdminDesk {
    users: Vec<Viewer>,
}

impl AdminDesk {
    pub async fn open(viewer: &Viewer, backend: &dyn AdminBackend) -> AppResult<Self> {
        require_admin(viewer)?;
        let users = backend.list_users().await?;
        Ok(Self { users })
    }

    pub fn users(&self) -> &[Viewer] {
        &self.users
    }

    pub fn stats(&self, offerings: &[Offering]) -> AdminStats {
        compute_stats(&self.users, offerings)
    }

    pub async fn block_user(&mut self, user_id: &str, backend: &dyn AdminBackend) -> AppResult<()> {
        let index = self.index_of(user_id)?;
        if self.users[index].is_admin() {
            return Err(AppError::Forbidden(
                "un administrateur ne peut pas être bloqué".to_string(),
            ));
        }
        backend.set_user_status(user_id, AccountStatus::Blocked).await?;
        self.users[index].status = AccountStatus::Blocked;
        info!(target: "audit", "action=BLOCK_USER user={}", user_id);
        Ok(())
    }

    /// Returns false when the user already owned the offering; nothing is sent then.
    pub async fn grant_access(
        &mut self,
        user_id: &str,
        product_id: &str,
        backend: &dyn AdminBackend,
    ) -> AppResult<bool> {
        let index = self.index_of(user_id)?;
        if self.users[index].owns(product_id) {
            return Ok(false);
        }
        backend.grant_product(user_id, product_id).await?;
        self.users[index].grant(product_id);
        info!(target: "audit", "action=GRANT_ACCESS user={} product={}", user_id, product_id);
        Ok(true)
    }

    fn index_of(&self, user_id: &str) -> AppResult<usize> {
        self.users
            .iter()
            .position(|u| u.id == user_id)
            .ok_or_else(|| AppError::NotFound(format!("utilisateur '{}'", user_id)))
    }
}
