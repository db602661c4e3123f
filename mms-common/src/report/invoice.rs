use super::{labelled, Cell, Sheet};
use crate::invoice::Invoice;

pub const INVOICE_COLUMNS: [&str; 8] = [
    "Invoice ID",
    "Invoice date",
    "Due date",
    "Member",
    "Subscription",
    "Amount",
    "Paid",
    "Comment",
];

/// One row per invoice followed by a total row
pub fn invoice_report(invoices: &[Invoice]) -> Sheet {
    let mut sheet = Sheet::new(&INVOICE_COLUMNS);

    let mut total = 0.0;
    for i in invoices {
        let row = vec![
            i.id.into(),
            i.issue_date.into(),
            i.due_date.into(),
            labelled(&i.member, i.member_id).into(),
            i.subscription.as_str().into(),
            i.amount.into(),
            if i.paid { "yes" } else { "no" }.into(),
            i.comment.as_str().into(),
        ];
        sheet.push_row(i.id, row);
        total += i.amount;
    }

    let mut total_row = vec![Cell::Empty; INVOICE_COLUMNS.len()];
    total_row[4] = "Total".into();
    total_row[5] = total.into();
    sheet.push_row(0, total_row);
    sheet
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn invoice(id: i64, amount: f64, paid: bool) -> Invoice {
        Invoice {
            id,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            member_id: 1,
            member: "Pat Payer".into(),
            issue_date: NaiveDate::from_ymd_opt(2019, 1, 1),
            last_send_date: None,
            due_date: NaiveDate::from_ymd_opt(2019, 2, 1),
            subscription_id: 2,
            subscription: "Ordinary Membership".into(),
            from_date: None,
            to_date: None,
            amount,
            paid,
            comment: String::new(),
        }
    }

    #[test]
    fn test_invoice_report_total_row() {
        let sheet = invoice_report(&[invoice(1, 450.0, true), invoice(2, 400.5, false)]);
        assert_eq!(sheet.row_count(), 3);

        let first = &sheet.rows()[0];
        assert_eq!(first[3].render(), "Pat Payer [1]");
        assert_eq!(first[6].render(), "yes");
        assert_eq!(sheet.rows()[1][6].render(), "no");

        let total = &sheet.rows()[2];
        assert_eq!(total[4].render(), "Total");
        assert_eq!(total[5], Cell::Float(850.5));
        assert_eq!(total[0], Cell::Empty);
    }

    #[test]
    fn test_empty_invoice_report_still_totals() {
        let sheet = invoice_report(&[]);
        assert_eq!(sheet.row_count(), 1);
        assert_eq!(sheet.rows()[0][5].render(), "0.00");
    }
}
