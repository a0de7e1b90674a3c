use ponwatch_snmp::{Pdu, SnmpClient, WalkControl};

use super::DeviceClient;
use crate::error::CoreError;

impl DeviceClient for SnmpClient {
    async fn fetch(&self, oid: &str) -> Result<Pdu, CoreError> {
        Ok(self.get(oid).await?)
    }

    async fn walk(
        &self,
        oid: &str,
        visit: &mut (dyn FnMut(Pdu) -> WalkControl + Send),
    ) -> Result<usize, CoreError> {
        Ok(SnmpClient::walk(self, oid, |pdu| visit(pdu)).await?)
    }
}
