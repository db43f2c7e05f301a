use shared::fcu_hal::{FcuAlertCondition, SystemStatus};

use crate::Fcu;

impl<'a> Fcu<'a> {
    pub(crate) fn update_alert_watchdog(&mut self) {
        let status = self.driver.system_status();

        self.alert_manager.assign_condition(
            FcuAlertCondition::SensorFault,
            self.consecutive_sensor_faults > 0,
        );

        self.update_persistent_sensor_fault();

        self.alert_manager.assign_condition(
            FcuAlertCondition::BatteryLow,
            status.contains(SystemStatus::BATTERY_LOW),
        );

        self.alert_manager.assign_condition(
            FcuAlertCondition::BatteryCritical,
            status.contains(SystemStatus::BATTERY_CRITICAL),
        );

        self.alert_manager.assign_condition(
            FcuAlertCondition::LogQueueOverflow,
            self.log_overflowing,
        );

        if let Some(bitmask) = self.alert_manager.take_pending_update() {
            fcu_info!("Alert conditions changed: {}", bitmask);
        }
    }

    fn update_persistent_sensor_fault(&mut self) {
        let persistent = self.consecutive_sensor_faults >= self.config.sensor_fault_alert_count;
        let was_persistent = self
            .alert_manager
            .is_set(FcuAlertCondition::PersistentSensorFault);

        if persistent == was_persistent {
            return;
        }

        if persistent {
            fcu_error!(
                "{} consecutive sensor faults, flying on stale readings",
                self.consecutive_sensor_faults
            );
        } else {
            fcu_info!("Sensors recovered");
        }

        self.alert_manager
            .assign_condition(FcuAlertCondition::PersistentSensorFault, persistent);
        self.refresh_indicator();
    }
}
