//! Position bookkeeping shared by every entry point that changes a pledge.
//!
//! Pledges only change after rewards are settled against the old pledge, and
//! `PoolAccrual::total_pledge` always equals the sum of position pledges in
//! the pool. Losses are realized lazily from the loss distributor's
//! accumulator; until then the registry has already dropped the claimed
//! capital while positions still carry their pre-claim pledge.

use capital_interfaces::math::accrued;
use capital_interfaces::{
    CapitalLedgerClient, LossDistributorClient, PoolRegistryClient, RealizedLoss,
};
use soroban_sdk::{Address, Env, Symbol, Vec};

use crate::error::Error;
use crate::events::LossesRealizedEvent;
use crate::storage::{DataKey, PoolPosition, Storage, UnderwriterInfo};

pub fn registry(env: &Env) -> Result<PoolRegistryClient<'_>, Error> {
    let address = Storage::address(env, &DataKey::PoolRegistry)?;
    Ok(PoolRegistryClient::new(env, &address))
}

pub fn loss_distributor(env: &Env) -> Result<LossDistributorClient<'_>, Error> {
    let address = Storage::address(env, &DataKey::LossDistributor)?;
    Ok(LossDistributorClient::new(env, &address))
}

pub fn capital_pool(env: &Env) -> Result<CapitalLedgerClient<'_>, Error> {
    let address = Storage::address(env, &DataKey::CapitalPool)?;
    Ok(CapitalLedgerClient::new(env, &address))
}

/// Empty position with every snapshot at the pool's current accumulators
pub fn fresh_position(env: &Env, pool_id: u32) -> Result<PoolPosition, Error> {
    let accrual = Storage::get_accrual(env, pool_id);
    Ok(PoolPosition {
        pledge: 0,
        loss_snapshot: loss_distributor(env)?.accumulator(&pool_id),
        premium_snapshot: accrual.premium_per_pledge,
        distressed_snapshot: accrual.distressed_per_pledge,
        pending_premium: 0,
        pending_distressed: 0,
        reserved: 0,
    })
}

/// Move accrued premium and distressed assets into the pending balances
pub fn settle_rewards(env: &Env, pool_id: u32, position: &mut PoolPosition) -> Result<(), Error> {
    let accrual = Storage::get_accrual(env, pool_id);

    let premium = accrued(accrual.premium_per_pledge, position.premium_snapshot, position.pledge)
        .ok_or(Error::Overflow)?;
    let distressed = accrued(
        accrual.distressed_per_pledge,
        position.distressed_snapshot,
        position.pledge,
    )
    .ok_or(Error::Overflow)?;

    position.pending_premium = position
        .pending_premium
        .checked_add(premium)
        .ok_or(Error::Overflow)?;
    position.pending_distressed = position
        .pending_distressed
        .checked_add(distressed)
        .ok_or(Error::Overflow)?;
    position.premium_snapshot = accrual.premium_per_pledge;
    position.distressed_snapshot = accrual.distressed_per_pledge;
    Ok(())
}

/// Set a position's pledge, keeping the pool's pledge sum in step
pub fn repledge(env: &Env, pool_id: u32, position: &mut PoolPosition, pledge: i128) -> Result<(), Error> {
    settle_rewards(env, pool_id, position)?;

    let mut accrual = Storage::get_accrual(env, pool_id);
    accrual.total_pledge = accrual
        .total_pledge
        .checked_sub(position.pledge)
        .and_then(|v| v.checked_add(pledge))
        .ok_or(Error::Overflow)?
        .max(0);
    Storage::set_accrual(env, pool_id, &accrual);

    position.pledge = pledge;
    Ok(())
}

/// Shrink withdrawal and deallocation reservations to fit the pledge
pub fn clamp_reservations(
    env: &Env,
    underwriter: &Address,
    pool_id: u32,
    position: &mut PoolPosition,
) -> Result<(), Error> {
    let registry = registry(env)?;
    let this = env.current_contract_address();

    if position.reserved > position.pledge {
        let excess = position.reserved - position.pledge;
        registry.update_pending_withdrawal(&this, &pool_id, &excess, &false);
        position.reserved = position.pledge;
    }

    if let Some(mut request) = Storage::get_deallocation(env, underwriter, pool_id) {
        let room = position.pledge - position.reserved;
        if request.amount > room {
            let excess = request.amount - room;
            registry.update_pending_withdrawal(&this, &pool_id, &excess, &false);
            request.amount = room;
            if room <= 0 {
                Storage::remove_deallocation(env, underwriter, pool_id);
            } else {
                Storage::set_deallocation(env, underwriter, pool_id, &request);
            }
        }
    }
    Ok(())
}

/// Withdraw a position from its pool entirely
///
/// Releases the remaining pledge and every reservation, and drops the
/// underwriter from the pool index. The record survives only while it still
/// holds unclaimed rewards. Callers remove `pool_id` from the allocation set.
pub fn close_position(
    env: &Env,
    underwriter: &Address,
    pool_id: u32,
    mut position: PoolPosition,
    adapter: &Address,
) -> Result<(), Error> {
    if position.pledge > 0 {
        registry(env)?.update_capital_allocation(
            &env.current_contract_address(),
            &pool_id,
            adapter,
            &position.pledge,
            &false,
        );
    }
    repledge(env, pool_id, &mut position, 0)?;
    clamp_reservations(env, underwriter, pool_id, &mut position)?;
    Storage::remove_from_pool(env, pool_id, underwriter);

    if position.pending_premium > 0 || position.pending_distressed > 0 {
        Storage::set_position(env, underwriter, pool_id, &position);
    } else {
        Storage::remove_position(env, underwriter, pool_id);
    }
    Ok(())
}

/// Close every allocated position, leaving the allocation set empty
pub fn close_all(env: &Env, underwriter: &Address, info: &mut UnderwriterInfo) -> Result<(), Error> {
    if info.allocations.is_empty() {
        return Ok(());
    }
    let adapter = info.adapter.clone().ok_or(Error::NotAllocated)?;

    for pool_id in info.allocations.iter() {
        if let Some(position) = Storage::get_position(env, underwriter, pool_id) {
            close_position(env, underwriter, pool_id, position, &adapter)?;
        }
    }
    info.allocations = Vec::new(env);
    Ok(())
}

/// Sum of unrealized losses across the underwriter's pools
pub fn pending_losses(env: &Env, underwriter: &Address) -> Result<i128, Error> {
    let Some(info) = Storage::get_info(env, underwriter) else {
        return Ok(0);
    };
    let distributor = loss_distributor(env)?;

    let mut total: i128 = 0;
    for pool_id in info.allocations.iter() {
        if let Some(position) = Storage::get_position(env, underwriter, pool_id) {
            let loss = distributor.pending_loss(&pool_id, &position.pledge, &position.loss_snapshot);
            total = total.checked_add(loss).ok_or(Error::Overflow)?;
        }
    }
    Ok(total)
}

/// Realize pending losses in risk-side state and return what the capital
/// pool has to settle
///
/// A position can owe more than it pledged, or more than the underwriter's
/// total pledge across pools. The part that cannot be charged is re-recorded
/// on the pool's other pledges, or written off when nobody else is left.
/// Never calls the capital pool, so it is safe inside its hooks.
pub fn realize(env: &Env, underwriter: &Address) -> Result<RealizedLoss, Error> {
    let Some(mut info) = Storage::get_info(env, underwriter) else {
        return Ok(RealizedLoss::default());
    };
    if info.allocations.is_empty() {
        return Ok(RealizedLoss::default());
    }
    let adapter = info.adapter.clone().ok_or(Error::NotAllocated)?;
    let distributor = loss_distributor(env)?;

    let mut losses: Vec<i128> = Vec::new(env);
    let mut total_loss: i128 = 0;
    for pool_id in info.allocations.iter() {
        let loss = match Storage::get_position(env, underwriter, pool_id) {
            Some(position) => {
                distributor.pending_loss(&pool_id, &position.pledge, &position.loss_snapshot)
            }
            None => 0,
        };
        losses.push_back(loss);
        total_loss = total_loss.checked_add(loss).ok_or(Error::Overflow)?;
    }
    if total_loss <= 0 {
        return Ok(RealizedLoss::default());
    }

    // Charge pools in allocation order until the total pledge runs out
    let mut budget = info.total_pledge;
    let mut charges: Vec<i128> = Vec::new(env);
    for (i, pool_id) in info.allocations.iter().enumerate() {
        let pledge = Storage::get_position(env, underwriter, pool_id)
            .map(|position| position.pledge)
            .unwrap_or(0);
        let charge = losses.get(i as u32).unwrap_or(0).min(pledge).min(budget).max(0);
        budget -= charge;
        charges.push_back(charge);
    }
    let applied = info.total_pledge - budget;
    let remaining_pledge = budget;

    let registry = registry(env)?;
    let this = env.current_contract_address();
    let mut written_off: i128 = 0;

    let mut kept: Vec<u32> = Vec::new(env);
    for (i, pool_id) in info.allocations.iter().enumerate() {
        let Some(mut position) = Storage::get_position(env, underwriter, pool_id) else {
            continue;
        };
        let loss = losses.get(i as u32).unwrap_or(0);
        let charge = charges.get(i as u32).unwrap_or(0);
        let uncharged = loss - charge;
        let after = (position.pledge - charge).min(remaining_pledge).max(0);
        let before = position.pledge;

        repledge(env, pool_id, &mut position, after)?;

        // The claim already took `loss` out of the registry. An uncharged
        // part moved to other pledges stays counted against them.
        let others = Storage::get_accrual(env, pool_id).total_pledge - after;
        let release = if uncharged > 0 && others > 0 {
            distributor.record_loss(&this, &pool_id, &uncharged, &others);
            before - after - charge
        } else {
            written_off = written_off.checked_add(uncharged).ok_or(Error::Overflow)?;
            before - after - loss
        };
        if release > 0 {
            registry.update_capital_allocation(&this, &pool_id, &adapter, &release, &false);
        }
        position.loss_snapshot = distributor.accumulator(&pool_id);

        if after == 0 {
            close_position(env, underwriter, pool_id, position, &adapter)?;
        } else {
            clamp_reservations(env, underwriter, pool_id, &mut position)?;
            Storage::set_position(env, underwriter, pool_id, &position);
            kept.push_back(pool_id);
        }
    }

    info.total_pledge = remaining_pledge;
    info.allocations = kept;
    Storage::set_info(env, underwriter, &info);

    env.events().publish(
        (Symbol::new(env, "losses_realized"), underwriter.clone()),
        LossesRealizedEvent {
            underwriter: underwriter.clone(),
            applied,
            written_off,
            remaining_pledge,
        },
    );

    Ok(RealizedLoss {
        charged: applied,
        written_off,
    })
}

/// Realize pending losses and settle them through the capital pool;
/// returns the amount charged to the underwriter
pub fn realize_and_apply(env: &Env, underwriter: &Address) -> Result<i128, Error> {
    let realized = realize(env, underwriter)?;
    if realized.is_empty() {
        return Ok(0);
    }
    let pool = capital_pool(env)?;
    let this = env.current_contract_address();
    if realized.charged > 0 {
        pool.apply_losses(&this, underwriter, &realized.charged);
    }
    if realized.written_off > 0 {
        pool.write_off_losses(&this, &realized.written_off);
    }

    // A charge can burn every share while principal is left over
    if pool.get_underwriter_account(underwriter).is_none() {
        if let Some(mut info) = Storage::get_info(env, underwriter) {
            close_all(env, underwriter, &mut info)?;
            info.total_pledge = 0;
            info.adapter = None;
            Storage::set_info(env, underwriter, &info);
        }
    }
    Ok(realized.charged)
}
