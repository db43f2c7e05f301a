use core::marker::PhantomData;

pub type AlertBitmaskType = u32;

pub struct AlertManager<C> {
    condition_bitmask: AlertBitmaskType,
    pending_update: bool,
    _marker: PhantomData<C>,
}

impl<C> AlertManager<C>
where
    C: Into<AlertBitmaskType>,
{
    pub const fn new() -> Self {
        Self {
            condition_bitmask: 0,
            pending_update: false,
            _marker: PhantomData,
        }
    }

    pub fn set_condition(&mut self, condition: C) {
        self.update_bitmask(self.condition_bitmask | Self::bit(condition));
    }

    pub fn clear_condition(&mut self, condition: C) {
        self.update_bitmask(self.condition_bitmask & !Self::bit(condition));
    }

    pub fn assign_condition(&mut self, condition: C, state: bool) {
        if state {
            self.set_condition(condition);
        } else {
            self.clear_condition(condition);
        }
    }

    pub fn is_set(&self, condition: C) -> bool {
        self.condition_bitmask & Self::bit(condition) != 0
    }

    pub fn condition_bitmask(&self) -> AlertBitmaskType {
        self.condition_bitmask
    }

    pub fn has_pending_update(&self) -> bool {
        self.pending_update
    }

    /// Returns the bitmask if it changed since the last call.
    pub fn take_pending_update(&mut self) -> Option<AlertBitmaskType> {
        if self.pending_update {
            self.pending_update = false;
            Some(self.condition_bitmask)
        } else {
            None
        }
    }

    fn update_bitmask(&mut self, bitmask: AlertBitmaskType) {
        if bitmask != self.condition_bitmask {
            self.condition_bitmask = bitmask;
            self.pending_update = true;
        }
    }

    fn bit(condition: C) -> AlertBitmaskType {
        1 << condition.into()
    }
}

impl<C> Default for AlertManager<C>
where
    C: Into<AlertBitmaskType>,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fcu_hal::FcuAlertCondition;

    #[test]
    fn test_set_and_clear() {
        let mut alerts = AlertManager::<FcuAlertCondition>::new();
        assert_eq!(alerts.condition_bitmask(), 0);

        alerts.set_condition(FcuAlertCondition::PyroFault);
        alerts.set_condition(FcuAlertCondition::BatteryLow);
        assert!(alerts.is_set(FcuAlertCondition::PyroFault));
        assert!(alerts.is_set(FcuAlertCondition::BatteryLow));
        assert!(!alerts.is_set(FcuAlertCondition::SensorFault));

        alerts.clear_condition(FcuAlertCondition::PyroFault);
        assert!(!alerts.is_set(FcuAlertCondition::PyroFault));
        assert_eq!(
            alerts.condition_bitmask(),
            1 << FcuAlertCondition::BatteryLow as AlertBitmaskType
        );
    }

    #[test]
    fn test_pending_update_only_on_change() {
        let mut alerts = AlertManager::<FcuAlertCondition>::new();
        assert!(!alerts.has_pending_update());

        alerts.assign_condition(FcuAlertCondition::SensorFault, true);
        assert_eq!(
            alerts.take_pending_update(),
            Some(1 << FcuAlertCondition::SensorFault as AlertBitmaskType)
        );
        assert_eq!(alerts.take_pending_update(), None);

        alerts.assign_condition(FcuAlertCondition::SensorFault, true);
        assert!(!alerts.has_pending_update());

        alerts.assign_condition(FcuAlertCondition::SensorFault, false);
        assert_eq!(alerts.take_pending_update(), Some(0));
    }
}
