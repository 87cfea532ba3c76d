use once_cell::sync::Lazy;

use crate::common::address::AddressManager;
use crate::context::Context;
use crate::criteria::{ParamType, SearchAttribute};
use crate::error::StoreResult;

const CONFIG_PATH: &str = "customer/manager/address/standard/";
const SUBMANAGERS_PATH: &str = "customer/manager/address/submanagers";
const RESOURCE: &str = "db-customer";

static SEARCH_CONFIG: Lazy<Vec<SearchAttribute>> = Lazy::new(|| {
    vec![
        SearchAttribute::new(
            "customer.address.id",
            "cad.\"id\"",
            "Customer address ID",
            ParamType::Int,
        )
        .internal(),
        SearchAttribute::new(
            "customer.address.siteid",
            "cad.\"siteid\"",
            "Customer address site ID",
            ParamType::Int,
        )
        .internal(),
        SearchAttribute::new(
            "customer.address.parentid",
            "cad.\"parentid\"",
            "Customer address parent ID",
            ParamType::Int,
        )
        .internal(),
        SearchAttribute::new(
            "customer.address.company",
            "cad.\"company\"",
            "Customer address company",
            ParamType::Str,
        ),
        SearchAttribute::new(
            "customer.address.vatid",
            "cad.\"vatid\"",
            "Customer address VAT ID",
            ParamType::Str,
        ),
        SearchAttribute::new(
            "customer.address.salutation",
            "cad.\"salutation\"",
            "Customer address salutation",
            ParamType::Str,
        ),
        SearchAttribute::new(
            "customer.address.title",
            "cad.\"title\"",
            "Customer address title",
            ParamType::Str,
        ),
        SearchAttribute::new(
            "customer.address.firstname",
            "cad.\"firstname\"",
            "Customer address firstname",
            ParamType::Str,
        ),
        SearchAttribute::new(
            "customer.address.lastname",
            "cad.\"lastname\"",
            "Customer address lastname",
            ParamType::Str,
        ),
        SearchAttribute::new(
            "customer.address.address1",
            "cad.\"address1\"",
            "Customer address part one",
            ParamType::Str,
        ),
        SearchAttribute::new(
            "customer.address.address2",
            "cad.\"address2\"",
            "Customer address part two",
            ParamType::Str,
        ),
        SearchAttribute::new(
            "customer.address.address3",
            "cad.\"address3\"",
            "Customer address part three",
            ParamType::Str,
        ),
        SearchAttribute::new(
            "customer.address.postal",
            "cad.\"postal\"",
            "Customer address postal",
            ParamType::Str,
        ),
        SearchAttribute::new(
            "customer.address.city",
            "cad.\"city\"",
            "Customer address city",
            ParamType::Str,
        ),
        SearchAttribute::new(
            "customer.address.state",
            "cad.\"state\"",
            "Customer address state",
            ParamType::Str,
        ),
        SearchAttribute::new(
            "customer.address.countryid",
            "cad.\"countryid\"",
            "Customer address country ID",
            ParamType::Str,
        ),
        SearchAttribute::new(
            "customer.address.languageid",
            "cad.\"langid\"",
            "Customer address language ID",
            ParamType::Str,
        ),
        SearchAttribute::new(
            "customer.address.telephone",
            "cad.\"telephone\"",
            "Customer address telephone",
            ParamType::Str,
        ),
        SearchAttribute::new(
            "customer.address.email",
            "cad.\"email\"",
            "Customer address email",
            ParamType::Str,
        ),
        SearchAttribute::new(
            "customer.address.telefax",
            "cad.\"telefax\"",
            "Customer address telefax",
            ParamType::Str,
        ),
        SearchAttribute::new(
            "customer.address.website",
            "cad.\"website\"",
            "Customer address website",
            ParamType::Str,
        ),
        SearchAttribute::new(
            "customer.address.longitude",
            "cad.\"longitude\"",
            "Customer address longitude",
            ParamType::Float,
        ),
        SearchAttribute::new(
            "customer.address.latitude",
            "cad.\"latitude\"",
            "Customer address latitude",
            ParamType::Float,
        ),
        SearchAttribute::new(
            "customer.address.flag",
            "cad.\"flag\"",
            "Customer address flag",
            ParamType::Int,
        ),
        SearchAttribute::new(
            "customer.address.position",
            "cad.\"pos\"",
            "Customer address position",
            ParamType::Int,
        ),
        SearchAttribute::new(
            "customer.address.ctime",
            "cad.\"ctime\"",
            "Customer address create date/time",
            ParamType::DateTime,
        )
        .internal(),
        SearchAttribute::new(
            "customer.address.mtime",
            "cad.\"mtime\"",
            "Customer address modify date/time",
            ParamType::DateTime,
        )
        .internal(),
        SearchAttribute::new(
            "customer.address.editor",
            "cad.\"editor\"",
            "Customer address editor",
            ParamType::Str,
        )
        .internal(),
    ]
});

/// Creates the default customer address manager
pub fn standard(ctx: Context) -> StoreResult<AddressManager> {
    AddressManager::new(
        ctx,
        RESOURCE,
        CONFIG_PATH,
        SUBMANAGERS_PATH,
        SEARCH_CONFIG.clone(),
    )
}
