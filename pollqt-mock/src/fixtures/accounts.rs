use serde_json::{Value, json};

/// Account list with one margin account per number.
#[must_use]
pub fn list(numbers: &[&str]) -> String {
    let accounts: Vec<Value> = numbers
        .iter()
        .enumerate()
        .map(|(i, n)| {
            json!({
                "type": "Margin",
                "number": n,
                "status": "Active",
                "isPrimary": i == 0,
                "isBilling": i == 0,
                "clientAccountType": "Individual",
            })
        })
        .collect();
    json!({ "accounts": accounts, "userId": 3_000_124 }).to_string()
}

/// Balances with a single CAD combined balance holding `cash`.
#[must_use]
pub fn balances(cash: f64) -> String {
    let cad = json!({
        "currency": "CAD",
        "cash": cash,
        "marketValue": 6017.0,
        "totalEquity": cash + 6017.0,
        "buyingPower": cash * 2.0,
        "maintenanceExcess": cash,
        "isRealTime": false,
    });
    json!({
        "perCurrencyBalances": [cad.clone()],
        "combinedBalances": [cad.clone()],
        "sodPerCurrencyBalances": [cad.clone()],
        "sodCombinedBalances": [cad],
    })
    .to_string()
}

/// Balances response whose combined list is empty.
#[must_use]
pub fn balances_without_combined() -> String {
    json!({
        "perCurrencyBalances": [],
        "combinedBalances": [],
        "sodPerCurrencyBalances": [],
        "sodCombinedBalances": [],
    })
    .to_string()
}

/// Positions, one per `(symbol, quantity)` pair, in the given order.
#[must_use]
pub fn positions(holdings: &[(&str, u32)]) -> String {
    let positions: Vec<Value> = holdings
        .iter()
        .enumerate()
        .map(|(i, (symbol, qty))| {
            json!({
                "symbol": symbol,
                "symbolId": 38_738 + i,
                "openQuantity": qty,
                "closedQuantity": 0,
                "currentMarketValue": f64::from(*qty) * 60.17,
                "currentPrice": 60.17,
                "averageEntryPrice": 60.23,
                "closedPnl": 0,
                "openPnl": -6,
                "totalCost": f64::from(*qty) * 60.23,
                "isRealTime": false,
                "isUnderReorg": false,
            })
        })
        .collect();
    json!({ "positions": positions }).to_string()
}

/// A single dividend activity.
#[must_use]
pub fn activities() -> String {
    json!({
        "activities": [{
            "type": "Dividends",
            "tradeDate": "2024-01-15T00:00:00.000000-05:00",
            "transactionDate": "2024-01-15T00:00:00.000000-05:00",
            "settlementDate": "2024-01-15T00:00:00.000000-05:00",
            "action": "",
            "symbol": "THI.TO",
            "symbolId": 38_738,
            "description": "DIVIDEND",
            "currency": "CAD",
            "quantity": 0,
            "price": 0,
            "grossAmount": 0,
            "commission": 0,
            "netAmount": 12.5,
        }]
    })
    .to_string()
}
